mod helpers;

mod codec_tests;
mod read_tests;
mod write_tests;
