#![cfg_attr(not(target_arch = "wasm32"), allow(dead_code))]

mod config;
mod contributions;
mod dropdown;
mod error;
mod github_stats;
mod http;
mod logging;
mod modal;
mod preferences;
mod reveal;
mod sidebar;
mod slideshow;
mod typewriter;

#[cfg(target_arch = "wasm32")]
mod dom;
#[cfg(target_arch = "wasm32")]
mod frontend;

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    eprintln!("Page behaviors only run in the browser. Run `trunk serve` or `trunk build --release`.");
}

#[cfg(target_arch = "wasm32")]
fn main() {
    frontend::run();
}
