// Answer upload: durable audio write, transcription, and the answer upsert.

pub mod audio_store;
pub mod handlers;
pub mod upload;
