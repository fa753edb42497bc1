use crate::RequestedColorMode;
use nu_ansi_term::Color;
use std::io::{self, IsTerminal};
use std::sync::atomic::{AtomicBool, Ordering};

pub const DEFAULT_EXIT_CODE: i32 = 1;

static USE_COLOR: AtomicBool = AtomicBool::new(true);

/// Resolves and stores the color preference. If the user has specified a
/// preference, it is honored. This preference can be specified through the
/// command line or the "NO_COLOR" environment variable. If the user hasn't
/// stated a preference, color is enabled if the output is a terminal.
pub(crate) fn configure_color(cmode: RequestedColorMode) {
    let enabled = match cmode {
        RequestedColorMode::Auto => {
            std::env::var_os("NO_COLOR").is_none() && io::stdout().is_terminal()
        }
        RequestedColorMode::On => true,
        RequestedColorMode::Off => false,
    };

    USE_COLOR.store(enabled, Ordering::Relaxed);
}

fn use_color() -> bool {
    USE_COLOR.load(Ordering::Relaxed)
}

pub(crate) fn error_internal(text: &str) {
    if use_color() {
        let style = Color::Red.bold();
        let text_style = Color::Default.bold();

        eprintln!("{} {}", style.paint("error:"), text_style.paint(text));
    } else {
        eprintln!("error: {}", text);
    }
}

pub(crate) fn warn_internal(text: &str) {
    if use_color() {
        let style = Color::Yellow.bold();
        let text_style = Color::Default.bold();

        eprintln!("{} {}", style.paint("warning:"), text_style.paint(text));
    } else {
        eprintln!("warning: {}", text);
    }
}

#[macro_export]
macro_rules! warn {
    ($($arg:tt)*) => ({
        let formatted = format!($($arg)*);
        $crate::utils::errors::warn_internal(&formatted);
    })
}

#[macro_export]
macro_rules! error {
    ($($arg:tt)*) => ({
        let formatted = format!($($arg)*);
        $crate::utils::errors::error_internal(&formatted);
    })
}

#[macro_export]
macro_rules! die {
    ($($arg:tt)*) => ({
        let formatted = format!($($arg)*);
        $crate::utils::errors::error_internal(&formatted);
        ::std::process::exit($crate::utils::errors::DEFAULT_EXIT_CODE);
    })
}
