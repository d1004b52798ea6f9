pub mod array_edit;
pub mod ordered_dict;
pub mod vec;
