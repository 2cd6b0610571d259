use std::io::{self, SeekFrom};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncSeek, AsyncSeekExt};

/// Number of leading bytes inspected when classifying a stream
pub const SNIFF_LEN: usize = 512;

/// The single image type uploads are normalized to
pub const NORMALIZED_MIME: &str = "image/webp";

const TEXT_PLAIN: &str = "text/plain; charset=utf-8";

/// Source formats the transcoder knows how to decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeFormat {
    Jpeg,
    Png,
    Gif,
    Other,
}

/// Result of classifying the leading bytes of an upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sniffed {
    mime: String,
    format: DecodeFormat,
}

impl Sniffed {
    /// Classifies a prefix by magic bytes, falling back to a text/binary check.
    pub fn classify(prefix: &[u8]) -> Self {
        let mime = match infer::get(prefix) {
            Some(kind) => kind.mime_type().to_string(),
            None if looks_like_text(prefix) => TEXT_PLAIN.to_string(),
            None => mime::APPLICATION_OCTET_STREAM.to_string(),
        };

        let format = match mime.as_str() {
            "image/jpeg" => DecodeFormat::Jpeg,
            "image/png" => DecodeFormat::Png,
            "image/gif" => DecodeFormat::Gif,
            _ => DecodeFormat::Other,
        };

        Self { mime, format }
    }

    pub fn mime(&self) -> &str {
        &self.mime
    }

    pub fn format(&self) -> DecodeFormat {
        self.format
    }

    pub fn is_image(&self) -> bool {
        self.mime.starts_with("image/")
    }

    pub fn is_normalized(&self) -> bool {
        self.mime == NORMALIZED_MIME
    }
}

#[derive(Debug, Error)]
pub enum SniffError {
    #[error("Failed to read file")]
    Read(#[source] io::Error),

    #[error("File processing error")]
    Rewind(#[source] io::Error),
}

/// Reads up to [`SNIFF_LEN`] bytes, classifies them and moves the reader back
/// to the start so the whole stream can be consumed afterwards.
pub async fn sniff<R>(reader: &mut R) -> Result<Sniffed, SniffError>
where
    R: AsyncRead + AsyncSeek + Unpin,
{
    let mut prefix = [0u8; SNIFF_LEN];
    let mut filled = 0;

    while filled < SNIFF_LEN {
        let n = reader
            .read(&mut prefix[filled..])
            .await
            .map_err(SniffError::Read)?;
        if n == 0 {
            break;
        }
        filled += n;
    }

    rewind(reader).await?;
    Ok(Sniffed::classify(&prefix[..filled]))
}

pub async fn rewind<R>(reader: &mut R) -> Result<(), SniffError>
where
    R: AsyncSeek + Unpin,
{
    reader
        .seek(SeekFrom::Start(0))
        .await
        .map(|_| ())
        .map_err(SniffError::Rewind)
}

/// Same binary-byte table as the WHATWG sniffing algorithm.
fn looks_like_text(prefix: &[u8]) -> bool {
    !prefix
        .iter()
        .any(|&b| matches!(b, 0x00..=0x08 | 0x0B | 0x0E..=0x1A | 0x1C..=0x1F))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::pin::Pin;
    use std::task::{Context, Poll};
    use tokio::io::ReadBuf;

    const PNG_MAGIC: &[u8] = &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

    #[test]
    fn test_classify_images() {
        let png = Sniffed::classify(PNG_MAGIC);
        assert_eq!(png.mime(), "image/png");
        assert_eq!(png.format(), DecodeFormat::Png);
        assert!(png.is_image());

        let jpeg = Sniffed::classify(&[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10]);
        assert_eq!(jpeg.format(), DecodeFormat::Jpeg);

        let gif = Sniffed::classify(b"GIF89a\x01\x00\x01\x00");
        assert_eq!(gif.format(), DecodeFormat::Gif);

        let webp = Sniffed::classify(b"RIFF\x24\x00\x00\x00WEBPVP8 ");
        assert_eq!(webp.mime(), NORMALIZED_MIME);
        assert!(webp.is_normalized());
        assert_eq!(webp.format(), DecodeFormat::Other);
    }

    #[test]
    fn test_classify_non_images() {
        let text = Sniffed::classify(b"hello, world\n");
        assert_eq!(text.mime(), "text/plain; charset=utf-8");
        assert!(!text.is_image());

        let empty = Sniffed::classify(b"");
        assert_eq!(empty.mime(), "text/plain; charset=utf-8");

        let binary = Sniffed::classify(&[0x00, 0x01, 0x02, 0x03]);
        assert_eq!(binary.mime(), "application/octet-stream");
        assert_eq!(binary.format(), DecodeFormat::Other);
    }

    #[tokio::test]
    async fn test_sniff_restores_position() {
        let mut data = PNG_MAGIC.to_vec();
        data.extend(std::iter::repeat_n(0xAB, 2048));
        let mut cursor = Cursor::new(data.clone());

        let sniffed = sniff(&mut cursor).await.unwrap();
        assert_eq!(sniffed.format(), DecodeFormat::Png);
        assert_eq!(cursor.position(), 0);

        let mut all = Vec::new();
        cursor.read_to_end(&mut all).await.unwrap();
        assert_eq!(all, data);
    }

    #[tokio::test]
    async fn test_sniff_short_stream() {
        let mut cursor = Cursor::new(b"tiny".to_vec());
        let sniffed = sniff(&mut cursor).await.unwrap();
        assert_eq!(sniffed.mime(), "text/plain; charset=utf-8");
        assert_eq!(cursor.position(), 0);
    }

    struct Unseekable(Cursor<Vec<u8>>);

    impl AsyncRead for Unseekable {
        fn poll_read(
            mut self: Pin<&mut Self>,
            cx: &mut Context<'_>,
            buf: &mut ReadBuf<'_>,
        ) -> Poll<io::Result<()>> {
            Pin::new(&mut self.0).poll_read(cx, buf)
        }
    }

    impl AsyncSeek for Unseekable {
        fn start_seek(self: Pin<&mut Self>, _position: SeekFrom) -> io::Result<()> {
            Err(io::Error::new(io::ErrorKind::Unsupported, "not seekable"))
        }

        fn poll_complete(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<u64>> {
            Poll::Ready(Ok(0))
        }
    }

    #[tokio::test]
    async fn test_sniff_fails_without_seek() {
        let mut reader = Unseekable(Cursor::new(b"hello".to_vec()));
        let err = sniff(&mut reader).await.unwrap_err();
        assert!(matches!(err, SniffError::Rewind(_)));
        assert_eq!(err.to_string(), "File processing error");
    }
}
