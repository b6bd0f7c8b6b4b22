pub mod cancel;
pub mod config;
pub mod controller;
pub mod filmstrip;
pub mod mapper;
pub mod peaks;
pub mod playback;
pub mod ruler;
pub mod source;
pub mod track;
pub mod viewport;
