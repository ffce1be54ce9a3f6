use std::io::Write;

use super::encoder::{Encodable, Encoder};
use super::writer::Writer;
use crate::error::Result;

pub struct Output<W> {
    writer: Box<dyn Writer<W>>,
    encoder: Box<dyn Encoder>,
}

impl<W: Write> Output<W> {
    pub fn new(writer: Box<dyn Writer<W>>, encoder: Box<dyn Encoder>) -> Self {
        Self { writer, encoder }
    }

    pub fn write(&mut self, value: &Encodable) -> Result<()> {
        let buf = self.encoder.encode(value)?;
        self.writer.write(&buf)?;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }
}
