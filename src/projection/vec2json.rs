use {
    crate::{
        buffer::vec::ObservableList,
        error::Result,
        view::{
            change::{ChangeEvent, ChangeRecord},
            observer::{Observer, Subscription},
            sequence::ObservableSequence,
        },
    },
    async_std::{
        io::{prelude::BufReadExt, BufReader, Read},
        stream::StreamExt,
    },
    serde::{de::DeserializeOwned, Serialize},
    std::{
        io::Write,
        marker::PhantomData,
        sync::{Arc, RwLock},
    },
};

//<<<<>>>><<>><><<>><<<*>>><<>><><<>><<<<>>>>

/// Change log writer: one JSON-encoded [`ChangeRecord`] per line.
pub struct ChangeJsonWriter<T, W>
where
    T: Clone + Serialize + Send + Sync + 'static,
    W: Write + Send + Sync,
{
    out: W,
    _phantom: PhantomData<fn(&T)>,
}

impl<T, W> ChangeJsonWriter<T, W>
where
    T: Clone + Serialize + Send + Sync + 'static,
    W: Write + Send + Sync,
{
    pub fn output(&self) -> &W {
        &self.out
    }

    fn write_record(&mut self, record: &ChangeRecord<T>) -> Result<()> {
        serde_json::to_writer(&mut self.out, record)?;
        self.out.write_all(b"\n")?;
        self.out.flush()?;
        Ok(())
    }
}

impl<T, W> Observer<T> for ChangeJsonWriter<T, W>
where
    T: Clone + Serialize + Send + Sync + 'static,
    W: Write + Send + Sync,
{
    fn notify(&mut self, event: &ChangeEvent<'_, T>) -> Result<()> {
        self.write_record(&event.to_record())
    }
}

pub trait SerializeJsonExt<T>: ObservableSequence<T>
where
    T: Clone + Serialize + Send + Sync + 'static,
{
    /// Log every change of this sequence to `out`.
    ///
    /// The log opens with a `Reset` carrying the current contents, so
    /// replaying it into an empty list reproduces this sequence.
    fn serialize_json<W: Write + Send + Sync + 'static>(
        &self,
        out: W,
    ) -> Result<(Arc<RwLock<ChangeJsonWriter<T, W>>>, Subscription<T>)> {
        let mut writer = ChangeJsonWriter {
            out,
            _phantom: PhantomData,
        };
        writer.write_record(&ChangeRecord::Reset {
            new_items: self.snapshot(),
            old_items: Vec::new(),
        })?;

        let writer = Arc::new(RwLock::new(writer));
        let sub = self.subscribe(writer.clone());
        Ok((writer, sub))
    }
}

impl<T, S> SerializeJsonExt<T> for S
where
    T: Clone + Serialize + Send + Sync + 'static,
    S: ObservableSequence<T> + ?Sized,
{
}

//<<<<>>>><<>><><<>><<<*>>><<>><><<>><<<<>>>>

impl<T> ObservableList<T>
where
    T: DeserializeOwned + Clone + Send + Sync + 'static,
{
    /// Apply a JSON change log line by line. Blank lines are skipped.
    pub async fn replay_json<R: Read + Unpin>(&self, read: R) -> Result<()> {
        let mut lines = BufReader::new(read).lines();
        while let Some(line) = lines.next().await {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let record = serde_json::from_str::<ChangeRecord<T>>(&line)?;
            self.apply_record(&record)?;
        }
        Ok(())
    }
}

//<<<<>>>><<>><><<>><<<*>>><<>><><<>><<<<>>>>

#[cfg(test)]
mod tests {
    use {
        crate::{buffer::vec::ObservableList, error::ViewError, projection::vec2json::*},
        async_std::task,
    };

    #[test]
    fn log_replays_into_an_equal_list() {
        let list: ObservableList<String> = vec!["a".to_string()].into_iter().collect();
        let (writer, sub) = list.serialize_json(Vec::new()).unwrap();

        list.push("b".into()).unwrap();
        list.insert(0, "c".into()).unwrap();
        list.move_item(0, 2).unwrap();
        list.set(1, "d".into()).unwrap();
        list.remove_at(0).unwrap();
        drop(sub);
        list.push("not logged".into()).unwrap();

        let bytes = writer.read().unwrap().output().clone();
        let text = String::from_utf8(bytes.clone()).unwrap();
        assert_eq!(text.lines().count(), 6);
        assert!(text.starts_with(r#"{"Reset":{"new_items":["a"],"old_items":[]}}"#));

        let copy = ObservableList::<String>::new();
        task::block_on(copy.replay_json(bytes.as_slice())).unwrap();
        assert_eq!(copy.to_vec(), vec!["d".to_string(), "c".to_string()]);
    }

    #[test]
    fn garbage_line_is_a_serialization_error() {
        let copy = ObservableList::<i32>::new();
        let res = task::block_on(copy.replay_json(&b"{\"Add\":{\"items\":[1],\"index\":0}}\n\nnope\n"[..]));
        assert!(matches!(res, Err(ViewError::Serialization(_))));
        assert_eq!(copy.to_vec(), vec![1]);
    }

    #[test]
    fn record_outside_the_list_is_rejected() {
        let copy: ObservableList<i32> = vec![1].into_iter().collect();
        let res = task::block_on(copy.replay_json(&b"{\"Remove\":{\"items\":[1],\"index\":3}}\n"[..]));
        assert!(matches!(res, Err(ViewError::IndexOutOfRange { .. })));
        assert_eq!(copy.version(), 0);
    }

    #[test]
    fn failing_sink_is_an_io_error() {
        struct Broken;
        impl Write for Broken {
            fn write(&mut self, _: &[u8]) -> std::io::Result<usize> {
                Err(std::io::ErrorKind::BrokenPipe.into())
            }
            fn flush(&mut self) -> std::io::Result<()> {
                Ok(())
            }
        }

        let list = ObservableList::<i32>::new();
        assert!(matches!(list.serialize_json(Broken), Err(ViewError::Io(_))));
    }
}
