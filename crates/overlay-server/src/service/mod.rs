pub mod authority;
pub mod history;
pub mod metrics;
pub mod presets;

pub use authority::SceneAuthority;
