//! PTY module - Claude CLI surfaces

mod surface;

pub use surface::PtySurfaceFactory;
