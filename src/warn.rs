//! Reporting of recovered errors. Warnings go to stderr, and are
//! counted per thread so that callers (and tests) can find out that
//! something was swallowed.

use std::{cell::Cell,
          sync::atomic::{AtomicBool, Ordering}};

thread_local! {
    static WARNINGS: Cell<usize> = Cell::new(0);
}

/// When set, `warn!` only counts, doesn't print.
pub static QUIET: AtomicBool = AtomicBool::new(false);

/// Number of warnings issued on the current thread so far.
pub fn warning_count() -> usize {
    WARNINGS.with(|w| w.get())
}

#[doc(hidden)]
pub fn _note_warning() -> bool {
    WARNINGS.with(|w| w.set(w.get() + 1));
    ! QUIET.load(Ordering::Relaxed)
}

#[macro_export]
macro_rules! warn {
    ($formatstr:expr $(,$arg:expr)*) => { {
        if $crate::warn::_note_warning() {
            use std::io::Write;
            let mut outp = std::io::BufWriter::new(std::io::stderr().lock());
            let _ = write!(&mut outp, "W: ");
            let _ = write!(&mut outp, $formatstr $(,$arg)*);
            let _ = writeln!(&mut outp, " at {:?} line {}", file!(), line!());
            let _ = outp.flush();
        }
    } }
}

#[macro_export]
macro_rules! nowarn {
    ($formatstr:expr $(,$arg:expr)*) => {
    }
}
