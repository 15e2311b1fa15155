use std::fmt::Display;
use std::format;
use std::io::Seek;
use std::io::Write;
use std::marker::PhantomData;

use crate::chart::Series;

/// The bytes of the declaration line besides the two array names and the
/// two lengths: `var  = new Array(), ` and ` = new Array();`.
const DECLARATION_BYTES: usize = 35;

/// Room for two lengths of up to 20 digits each.
const LENGTH_BYTES: usize = 40;

/// Writes the points of one series as a script that fills two global
/// arrays, `xs` and `ys`.
///
/// The array lengths are only known once every point is written, so the
/// first line is reserved up front and the declaration is written over it
/// by [`SeriesWriter::end`].
pub struct SeriesWriter<'a, W, X, Y> {
    writer: W,
    index: usize,
    series: &'a Series,
    xtype: PhantomData<X>,
    ytype: PhantomData<Y>,
}

impl<'a, W: Write + Seek, X: Display, Y: Display> SeriesWriter<'a, W, X, Y> {
    pub fn new(writer: W, series: &'a Series) -> Self {
        Self {
            writer,
            index: 0,
            series,
            xtype: PhantomData,
            ytype: PhantomData,
        }
    }

    pub fn start(&mut self) -> Result<(), std::io::Error> {
        let reserved_bytes =
            DECLARATION_BYTES + LENGTH_BYTES + self.series.xs.len() + self.series.ys.len();
        let whitespaces = b" ".repeat(reserved_bytes);

        self.writer.write_all(&whitespaces)?;
        self.writer.write_all(b"\n")
    }

    pub fn write(&mut self, x: X, y: Y) -> Result<(), std::io::Error> {
        let line = format!(
            "{xs}[{idx}] = {x}; {ys}[{idx}] = {y};\n",
            xs = self.series.xs,
            ys = self.series.ys,
            idx = self.index,
        );

        self.writer.write_all(line.as_bytes())?;
        self.index += 1;

        Ok(())
    }

    pub fn end(mut self) -> Result<(), std::io::Error> {
        self.writer.flush()?;
        self.writer.rewind()?;

        let declaration = format!(
            "var {xs} = new Array({size}), {ys} = new Array({size});",
            xs = self.series.xs,
            ys = self.series.ys,
            size = self.index
        );

        self.writer.write_all(declaration.as_bytes())?;
        self.writer.flush()
    }
}
