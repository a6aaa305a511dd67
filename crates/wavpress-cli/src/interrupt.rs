use anyhow::{Context, Result as AnyResult};
use std::sync::atomic::{AtomicBool, Ordering};
use wavpress::convert::CancelToken;

static INTERRUPTED: AtomicBool = AtomicBool::new(false);

/// First Ctrl-C lets in-flight files finish; a second one exits at once.
pub fn init(token: CancelToken) -> AnyResult<()> {
    ctrlc::set_handler(move || ctrlc_handler(&token))
        .context("installing Ctrl-C handler")
}

fn ctrlc_handler(token: &CancelToken) {
    if INTERRUPTED.swap(true, Ordering::SeqCst) {
        std::process::exit(130);
    }
    eprintln!("cancelling, waiting for files in progress (Ctrl-C again to abort)");
    token.cancel();
}
