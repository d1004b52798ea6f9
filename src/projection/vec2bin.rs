use {
    crate::{
        buffer::vec::ObservableList,
        error::{Result, ViewError},
        view::{
            change::{ChangeEvent, ChangeRecord},
            observer::{Observer, Subscription},
            sequence::ObservableSequence,
        },
    },
    serde::{de::DeserializeOwned, Serialize},
    std::{
        io::{ErrorKind, Read, Write},
        marker::PhantomData,
        sync::{Arc, RwLock},
    },
};

//<<<<>>>><<>><><<>><<<*>>><<>><><<>><<<<>>>>

/// Serialization Observer writing bincode frames, each prefixed with its
/// size as a little-endian `u64`.
pub struct ChangeBinWriter<T, W>
where
    T: Clone + Serialize + Send + Sync + 'static,
    W: Write + Send + Sync,
{
    out: W,
    _phantom: PhantomData<fn(&T)>,
}

impl<T, W> ChangeBinWriter<T, W>
where
    T: Clone + Serialize + Send + Sync + 'static,
    W: Write + Send + Sync,
{
    pub fn output(&self) -> &W {
        &self.out
    }

    fn write_record(&mut self, record: &ChangeRecord<T>) -> Result<()> {
        self.out
            .write_all(&bincode::serialized_size(record)?.to_le_bytes())?;
        bincode::serialize_into(&mut self.out, record)?;
        self.out.flush()?;
        Ok(())
    }
}

impl<T, W> Observer<T> for ChangeBinWriter<T, W>
where
    T: Clone + Serialize + Send + Sync + 'static,
    W: Write + Send + Sync,
{
    fn notify(&mut self, event: &ChangeEvent<'_, T>) -> Result<()> {
        self.write_record(&event.to_record())
    }
}

pub trait SerializeBinExt<T>: ObservableSequence<T>
where
    T: Clone + Serialize + Send + Sync + 'static,
{
    /// Binary counterpart of `serialize_json`.
    fn serialize_bin<W: Write + Send + Sync + 'static>(
        &self,
        out: W,
    ) -> Result<(Arc<RwLock<ChangeBinWriter<T, W>>>, Subscription<T>)> {
        let mut writer = ChangeBinWriter {
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

impl<T, S> SerializeBinExt<T> for S
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
    /// Apply a binary change log until end of input.
    pub fn replay_bin<R: Read>(&self, mut read: R) -> Result<()> {
        loop {
            let mut size = [0u8; 8];
            match read.read_exact(&mut size) {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::UnexpectedEof => return Ok(()),
                Err(e) => return Err(e.into()),
            }

            // prefix bounds the decoder
            let mut frame = read.by_ref().take(u64::from_le_bytes(size));
            let record: ChangeRecord<T> = bincode::deserialize_from(&mut frame)?;
            if frame.limit() != 0 {
                return Err(ViewError::Serialization(format!(
                    "{} unread bytes in frame",
                    frame.limit()
                )));
            }
            self.apply_record(&record)?;
        }
    }
}

//<<<<>>>><<>><><<>><<<*>>><<>><><<>><<<<>>>>
