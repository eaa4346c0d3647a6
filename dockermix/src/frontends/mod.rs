mod mix_file;

pub use mix_file::{ContainerDefinition, MixConfig, MixFileFrontend};
