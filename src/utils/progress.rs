//! Spinner used while the CLI waits for indexing. Without the `progress`
//! feature the same API compiles to nothing.

#[cfg(feature = "progress")]
pub use indicatif::{ProgressBar, ProgressStyle};

#[cfg(not(feature = "progress"))]
pub use self::noop::*;

#[cfg(not(feature = "progress"))]
mod noop {
    use std::borrow::Cow;
    use std::time::Duration;

    #[derive(Clone)]
    pub struct ProgressBar;

    impl ProgressBar {
        pub fn new_spinner() -> Self {
            ProgressBar
        }

        pub fn set_style(&self, _style: ProgressStyle) {}
        pub fn set_message(&self, _msg: impl Into<Cow<'static, str>>) {}
        pub fn enable_steady_tick(&self, _interval: Duration) {}
        pub fn finish_and_clear(&self) {}
    }

    pub struct ProgressStyle;

    impl ProgressStyle {
        pub fn default_spinner() -> Self {
            ProgressStyle
        }

        pub fn template(self, _template: &str) -> Result<Self, std::convert::Infallible> {
            Ok(self)
        }
    }
}
