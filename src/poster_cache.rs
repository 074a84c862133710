use crate::types::ImdbId;
use thiserror::Error;

use std::{
    io::Read,
    path::{Path, PathBuf},
};

#[derive(Debug, Error)]
pub enum GetPosterError {
    #[error("io error")]
    Io(#[from] std::io::Error),
    #[error("failed to retrieve poster")]
    Isahc(#[from] isahc::Error),
    #[error("no poster available for {0}")]
    NoPoster(ImdbId),
    #[error("poster request returned {0}")]
    Status(isahc::http::StatusCode),
}

/// Posters are downloaded once and served from disk afterwards.
pub struct PosterCache {
    cache_dir: PathBuf,
}

impl PosterCache {
    pub fn new(cache_dir: PathBuf) -> PosterCache {
        PosterCache { cache_dir }
    }

    #[cfg(test)]
    fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    pub fn get(&self, id: &ImdbId, url: &str) -> Result<Vec<u8>, GetPosterError> {
        let fs_path = self.path_for(id);
        if !fs_path.exists() {
            if !self.cache_dir.exists() {
                std::fs::create_dir_all(&self.cache_dir)?;
            }

            let mut response = isahc::get(url)?;
            if !response.status().is_success() {
                return Err(GetPosterError::Status(response.status()));
            }

            let body = response.body_mut();
            let mut content = Vec::new();
            body.read_to_end(&mut content)?;
            std::fs::write(&fs_path, content)?;
        }
        Ok(std::fs::read(fs_path)?)
    }

    fn path_for(&self, id: &ImdbId) -> PathBuf {
        // Ids are opaque; keep only characters that are safe in a file name.
        let name: String = id
            .0
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
            .collect();
        self.cache_dir.join(name)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    use std::{io::Write, net::TcpListener};

    #[test]
    fn test_cached_poster_served_from_disk() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let cache = PosterCache::new(dir.path().join("posters"));
        let id = ImdbId::from("tt0076759");

        std::fs::create_dir_all(cache.cache_dir()).expect("Failed to create cache dir");
        std::fs::write(cache.path_for(&id), b"jpeg bytes").expect("Failed to seed cache");

        // Unroutable url, so a network fetch would fail the test.
        let content = cache
            .get(&id, "http://127.0.0.1:9/poster.jpg")
            .expect("Failed to get poster");
        assert_eq!(content, b"jpeg bytes");
    }

    #[test]
    fn test_error_status_not_cached() {
        let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind listener");
        let addr = listener.local_addr().expect("Failed to get listener addr");
        let server = std::thread::spawn(move || {
            let (mut stream, _) = listener.accept().expect("Failed to accept connection");
            let mut request = [0u8; 1024];
            let _ = stream.read(&mut request);
            stream
                .write_all(
                    b"HTTP/1.1 404 Not Found\r\n\
                    Content-Length: 18\r\n\
                    Connection: close\r\n\
                    \r\n\
                    404 page not found",
                )
                .expect("Failed to write response");
        });

        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let cache = PosterCache::new(dir.path().join("posters"));
        let id = ImdbId::from("tt0076759");

        let err = cache
            .get(&id, &format!("http://{addr}/poster.jpg"))
            .expect_err("Error page served as poster");
        assert!(matches!(err, GetPosterError::Status(s) if s.as_u16() == 404));
        assert!(!cache.path_for(&id).exists());

        server.join().expect("Server thread panicked");
    }

    #[test]
    fn test_path_stays_in_cache_dir() {
        let cache = PosterCache::new(PathBuf::from("/tmp/posters"));
        let path = cache.path_for(&ImdbId::from("../../etc/passwd"));
        assert_eq!(path, Path::new("/tmp/posters/______etc_passwd"));
    }
}
