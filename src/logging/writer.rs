// SPDX-License-Identifier: GPL-3.0-only
use indicatif::MultiProgress;
use std::io::{self, Write};
use tracing_subscriber::fmt::MakeWriter;

/// Writes log lines to stderr above the active progress bars.
///
/// Each event is buffered and printed while the bars are suspended, so a
/// redraw never lands in the middle of a line.
#[derive(Clone)]
pub struct ProgressAwareStderr {
    multi: MultiProgress,
}

impl ProgressAwareStderr {
    pub fn new(multi: MultiProgress) -> Self {
        Self { multi }
    }
}

impl<'a> MakeWriter<'a> for ProgressAwareStderr {
    type Writer = SuspendedLine<io::Stderr>;

    fn make_writer(&'a self) -> Self::Writer {
        SuspendedLine::new(self.multi.clone(), io::stderr())
    }
}

/// One formatted event, flushed to `out` on drop
pub struct SuspendedLine<W: Write> {
    multi: MultiProgress,
    buf: Vec<u8>,
    out: W,
}

impl<W: Write> SuspendedLine<W> {
    fn new(multi: MultiProgress, out: W) -> Self {
        Self {
            multi,
            buf: Vec::new(),
            out,
        }
    }
}

impl<W: Write> Write for SuspendedLine<W> {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<W: Write> Drop for SuspendedLine<W> {
    fn drop(&mut self) {
        if self.buf.is_empty() {
            return;
        }
        let Self { multi, buf, out } = self;
        // Nowhere left to report a failed log write
        let _ = multi.suspend(|| out.write_all(&buf[..]).and_then(|()| out.flush()));
    }
}
