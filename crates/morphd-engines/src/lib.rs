//! External conversion engines for morphd.
//!
//! Each format category (audio, image, document, archive, presentation,
//! font, ebook) is served by a [`Capability`]: a stateless contract that
//! names its supported extensions and delegates the actual transcoding to
//! an out-of-process tool (ffmpeg, LibreOffice, pdftoppm, ImageMagick, 7z,
//! FontForge, Calibre). The one exception is PDF page manipulation, which
//! is done in-process by the [`pages`] algebra.

pub mod capability;
pub mod command;
pub mod pages;
pub mod registry;
pub mod tools;

mod archive;
mod audio;
mod document;
mod ebook;
mod font;
mod image;
mod office;
mod presentation;

pub use archive::ArchiveCapability;
pub use audio::AudioCapability;
pub use capability::{
    progress_channel, Capability, ConversionOutcome, ConvertOptions, ConvertRequest,
    ProgressSender,
};
pub use command::{ToolCommand, ToolOutput};
pub use document::DocumentCapability;
pub use ebook::EbookCapability;
pub use font::FontCapability;
pub use image::ImageCapability;
pub use presentation::PresentationCapability;
pub use registry::{CapabilityRegistry, CategoryFormats, ToolOverrides};
pub use tools::{check_tool, check_tools, require_tool, ToolInfo};
