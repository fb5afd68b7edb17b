// Copyright 2024 FastLabs Developers
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::fmt;
use std::fs;
use std::fs::File;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;
use std::sync::MutexGuard;

use crate::Error;
use crate::append::Append;
use crate::layout::Layout;
use crate::layout::LineLayout;
use crate::record::Record;

/// An appender that writes log records to an arbitrary writable stream.
///
/// Each record is written with a single `write_all` call while holding the stream's lock, so
/// records from concurrent dispatches never interleave.
///
/// # Examples
///
/// ```
/// use logservice::append::Stream;
/// use logservice::layout::JsonLayout;
///
/// let buffer = Stream::new(Vec::<u8>::new()).with_layout(JsonLayout::default());
/// ```
pub struct Stream<W: Write + Send + 'static> {
    writer: Mutex<W>,
    layout: Box<dyn Layout>,
}

impl<W: Write + Send + 'static> fmt::Debug for Stream<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stream")
            .field("writer", &std::any::type_name::<W>())
            .field("layout", &self.layout)
            .finish()
    }
}

impl<W: Write + Send + 'static> Stream<W> {
    /// Create a new stream appender. Default to [`LineLayout`] with stack traces expanded.
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
            layout: Box::new(LineLayout::default().include_stacktraces(true)),
        }
    }

    /// Set the layout for the [`Stream`] appender.
    pub fn with_layout(mut self, layout: impl Into<Box<dyn Layout>>) -> Self {
        self.layout = layout.into();
        self
    }

    fn lock(&self) -> Result<MutexGuard<'_, W>, Error> {
        self.writer
            .lock()
            .map_err(|_| Error::new("stream writer lock poisoned"))
    }
}

impl Stream<File> {
    /// Open `path` for appending, creating it and its parent directories when missing.
    pub fn file(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            fs::create_dir_all(dir).map_err(|err| {
                Error::new("failed to create log directory")
                    .with_context("path", dir.display())
                    .with_source(err)
            })?;
        }

        let file = OpenOptions::new()
            .append(true)
            .create(true)
            .open(path)
            .map_err(|err| {
                Error::new("failed to open log file")
                    .with_context("path", path.display())
                    .with_source(err)
            })?;
        Ok(Stream::new(file))
    }
}

impl<W: Write + Send + 'static> Append for Stream<W> {
    fn append(&self, record: &Record) -> Result<(), Error> {
        let mut bytes = self.layout.format(record)?;
        bytes.push(b'\n');
        self.lock()?
            .write_all(&bytes)
            .map_err(Error::from_io_error)
    }

    fn flush(&self) -> Result<(), Error> {
        self.lock()?.flush().map_err(Error::from_io_error)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Read;

    use super::*;
    use crate::layout::JsonLayout;
    use crate::record::Level;

    #[test]
    fn file_stream_appends_one_line_per_record() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs").join("stderr.log");
        let stream = Stream::file(&path)
            .unwrap()
            .with_layout(JsonLayout::default());

        for message in ["first", "second"] {
            let record = Record::builder()
                .level(Level::Warning)
                .message(message)
                .build();
            stream.append(&record).unwrap();
        }
        stream.flush().unwrap();

        let mut contents = String::new();
        File::open(&path)
            .unwrap()
            .read_to_string(&mut contents)
            .unwrap();
        let lines: Vec<serde_json::Value> = contents
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["message"], "first");
        assert_eq!(lines[1]["level_name"], "WARNING");
    }

    #[test]
    fn write_failure_is_returned() {
        struct Broken;

        impl Write for Broken {
            fn write(&mut self, _: &[u8]) -> std::io::Result<usize> {
                Err(std::io::Error::other("broken pipe"))
            }

            fn flush(&mut self) -> std::io::Result<()> {
                Ok(())
            }
        }

        let stream = Stream::new(Broken);
        let err = stream.append(&Record::builder().build()).unwrap_err();
        assert_eq!(err.message(), "failed to perform io");
    }
}
