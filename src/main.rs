use rsh::Interpreter;
use std::sync::atomic::Ordering;

fn main() -> anyhow::Result<()> {
    let mut sh = Interpreter::new();

    // Ctrl-C stops a running monitor view instead of killing the shell.
    let interrupted = sh.interrupt_flag();
    ctrlc::set_handler(move || {
        interrupted.store(true, Ordering::SeqCst);
    })?;

    sh.repl()
}
