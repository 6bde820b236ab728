pub mod id;
pub mod mood;
pub mod playlist;
pub mod track;
