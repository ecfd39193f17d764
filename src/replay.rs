//! Recorded detection logs: one frame per line as
//! `<timestamp seconds>:<JSON array of detections>`.

use crate::detection::Detection;
use crate::error::Error;
use crate::frame::Frame;

use std::io::{BufRead, Lines, Write};

/// Parses one log line. Blank lines and `#` comments yield `None`.
pub fn parse_line(line: &str) -> Result<Option<Frame>, Error> {
    let line = line.trim();

    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }

    let idx = line
        .find(':')
        .ok_or_else(|| Error::MalformedRecord("expected `:`".to_string()))?;
    let (ts, vector) = line.split_at(idx);

    let timestamp: f64 = ts
        .trim()
        .parse()
        .map_err(|_| Error::MalformedRecord(format!("bad timestamp `{}`", ts.trim())))?;

    let detections: Vec<Detection> = serde_json::from_str(&vector[1..])?;

    Ok(Some(Frame::new(timestamp, detections)))
}

pub fn write_frame<W: Write>(mut w: W, frame: &Frame) -> Result<(), Error> {
    write!(w, "{}:", frame.timestamp)?;
    serde_json::to_writer(&mut w, &frame.detections)?;
    writeln!(w)?;

    Ok(())
}

pub struct FrameReader<R> {
    lines: Lines<R>,
    line_no: usize,
}

impl<R: BufRead> Iterator for FrameReader<R> {
    type Item = Result<Frame, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = match self.lines.next()? {
                Ok(line) => line,
                Err(err) => return Some(Err(err.into())),
            };
            self.line_no += 1;

            match parse_line(&line) {
                Ok(Some(frame)) => return Some(Ok(frame)),
                Ok(None) => continue,
                Err(err) => {
                    return Some(Err(Error::MalformedRecord(format!(
                        "line {}: {}",
                        self.line_no, err
                    ))))
                }
            }
        }
    }
}

pub fn read_frames<R: BufRead>(reader: R) -> FrameReader<R> {
    FrameReader {
        lines: reader.lines(),
        line_no: 0,
    }
}
