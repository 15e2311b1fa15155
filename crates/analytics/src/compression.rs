use std::io::BufRead;
use std::io::Read;
use std::io::Result;

use flate2::bufread::MultiGzDecoder;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Wraps `reader` in a gzip decoder when its first bytes carry the gzip
/// magic number, and returns it unchanged otherwise.
pub(crate) fn decompress<R: BufRead + 'static>(mut reader: R) -> Result<Box<dyn Read>> {
    if reader.fill_buf()?.starts_with(&GZIP_MAGIC) {
        Ok(Box::new(MultiGzDecoder::new(reader)))
    } else {
        Ok(Box::new(reader))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use std::io::Cursor;
    use std::io::Write;

    #[test]
    fn decompresses_gzip_input() -> Result<()> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(b"mime;rtype\nPDF;ARTICLE\n")?;
        let compressed = encoder.finish()?;

        let mut content = String::new();
        decompress(Cursor::new(compressed))?.read_to_string(&mut content)?;

        assert_eq!(content, "mime;rtype\nPDF;ARTICLE\n");

        Ok(())
    }

    #[test]
    fn passes_plain_input_through() -> Result<()> {
        let mut content = String::new();
        decompress(Cursor::new(b"mime\nHTML\n".to_vec()))?.read_to_string(&mut content)?;

        assert_eq!(content, "mime\nHTML\n");

        Ok(())
    }
}
