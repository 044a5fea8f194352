// Audio module - capture buffering and the WAV container
//
// - buffer_pool: pre-allocated capture chunks moved over rtrb queues
// - codec: WAV decode/encode through hound

pub mod buffer_pool;
pub mod codec;

pub use buffer_pool::{chunk_len_for_interval, ChunkCollector, ChunkPool, ChunkWriter};
pub use codec::{encode_wav, read_wav_file, write_wav_file, AudioDecoder, WavDecoder};
