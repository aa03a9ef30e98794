// io.rs - Loading and saving grids as images, off the async runtime

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error};

use crate::error::{Error, Result};
use crate::grid::Grid;

/// Where grids come from and go to.
///
/// Images travel as `width × height` bytes in column-major order
/// (see [`Grid::from_column_major`]). Implementations may block; they are
/// only ever called from the io task.
pub trait ImageStore: Send + 'static {
    fn load(&mut self, name: &str, width: usize, height: usize) -> Result<Vec<u8>>;
    fn store(&mut self, name: &str, width: usize, height: usize, bytes: &[u8]) -> Result<()>;
}

impl<S: ImageStore + ?Sized> ImageStore for Box<S> {
    fn load(&mut self, name: &str, width: usize, height: usize) -> Result<Vec<u8>> {
        (**self).load(name, width, height)
    }

    fn store(&mut self, name: &str, width: usize, height: usize, bytes: &[u8]) -> Result<()> {
        (**self).store(name, width, height, bytes)
    }
}

/// Binary PGM (`P5`) files: `{input}/{name}.pgm` in, `{output}/{name}.pgm` out.
#[derive(Debug, Clone)]
pub struct PgmStore {
    input: PathBuf,
    output: PathBuf,
}

impl PgmStore {
    pub fn new(input: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self { input: input.into(), output: output.into() }
    }

    pub fn input_path(&self, name: &str) -> PathBuf {
        self.input.join(format!("{name}.pgm"))
    }

    pub fn output_path(&self, name: &str) -> PathBuf {
        self.output.join(format!("{name}.pgm"))
    }
}

impl ImageStore for PgmStore {
    fn load(&mut self, name: &str, width: usize, height: usize) -> Result<Vec<u8>> {
        let data = fs::read(self.input_path(name))?;
        let (found_width, found_height, raster) = decode_pgm(name, &data)?;
        if (found_width, found_height) != (width, height) {
            return Err(Error::ImageSize {
                name: name.to_owned(),
                expected: (width, height),
                found: (found_width, found_height),
            });
        }

        // PGM rasters are row-major.
        let mut bytes = Vec::with_capacity(width * height);
        for col in 0..width {
            for row in 0..height {
                bytes.push(raster[row * width + col]);
            }
        }
        Ok(bytes)
    }

    fn store(&mut self, name: &str, width: usize, height: usize, bytes: &[u8]) -> Result<()> {
        fs::create_dir_all(&self.output)?;
        let mut raster = vec![0; width * height];
        for col in 0..width {
            for row in 0..height {
                raster[row * width + col] = bytes[col * height + row];
            }
        }
        write_pgm(&self.output_path(name), width, height, &raster)
    }
}

fn write_pgm(path: &Path, width: usize, height: usize, raster: &[u8]) -> Result<()> {
    let mut data = format!("P5\n{width} {height}\n255\n").into_bytes();
    data.extend_from_slice(raster);
    fs::write(path, data)?;
    Ok(())
}

/// Splits a `P5` image into its dimensions and raster.
fn decode_pgm<'a>(name: &str, data: &'a [u8]) -> Result<(usize, usize, &'a [u8])> {
    let malformed = |reason: &str| Error::Pgm { name: name.to_owned(), reason: reason.to_owned() };

    // Four header fields separated by whitespace, with `#` comments allowed.
    let mut fields = Vec::with_capacity(4);
    let mut pos = 0;
    while fields.len() < 4 {
        while pos < data.len() && (data[pos].is_ascii_whitespace() || data[pos] == b'#') {
            if data[pos] == b'#' {
                while pos < data.len() && data[pos] != b'\n' {
                    pos += 1;
                }
            } else {
                pos += 1;
            }
        }
        let start = pos;
        while pos < data.len() && !data[pos].is_ascii_whitespace() {
            pos += 1;
        }
        if start == pos {
            return Err(malformed("truncated header"));
        }
        fields.push(std::str::from_utf8(&data[start..pos]).map_err(|_| malformed("header is not ascii"))?);
    }
    // Exactly one whitespace byte separates the header from the raster.
    pos += 1;

    if fields[0] != "P5" {
        return Err(malformed("expected magic number P5"));
    }
    let number = |field: &str| field.parse::<usize>().map_err(|_| malformed("bad number in header"));
    let (width, height, max) = (number(fields[1])?, number(fields[2])?, number(fields[3])?);
    if max != 255 {
        return Err(malformed("only maxval 255 is supported"));
    }

    let end = width
        .checked_mul(height)
        .and_then(|size| size.checked_add(pos))
        .ok_or_else(|| malformed("image is too large"))?;
    let raster = data.get(pos..end).ok_or_else(|| malformed("raster is too short"))?;
    Ok((width, height, raster))
}

/// Images kept in memory. Clones share the same images.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    images: Arc<Mutex<HashMap<String, Vec<u8>>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, name: impl Into<String>, bytes: Vec<u8>) {
        self.lock().insert(name.into(), bytes);
    }

    pub fn insert_grid(&self, name: impl Into<String>, grid: &Grid) {
        self.insert(name, grid.to_column_major());
    }

    pub fn get(&self, name: &str) -> Option<Vec<u8>> {
        self.lock().get(name).cloned()
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.lock().keys().cloned().collect();
        names.sort();
        names
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Vec<u8>>> {
        self.images.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ImageStore for MemoryStore {
    fn load(&mut self, name: &str, width: usize, height: usize) -> Result<Vec<u8>> {
        let bytes = self.get(name).ok_or_else(|| Error::ImageNotFound(name.to_owned()))?;
        if bytes.len() != width * height {
            return Err(Error::ImageSize {
                name: name.to_owned(),
                expected: (width, height),
                found: (bytes.len() / height.max(1), height),
            });
        }
        Ok(bytes)
    }

    fn store(&mut self, name: &str, _width: usize, _height: usize, bytes: &[u8]) -> Result<()> {
        self.insert(name, bytes.to_vec());
        Ok(())
    }
}

/// Serves a fixed initial world for one name and hands everything else to
/// `inner`. Lets a run start from a pattern while still saving to disk.
pub struct SeededStore<S> {
    name: String,
    seed: Grid,
    inner: S,
}

impl<S> SeededStore<S> {
    pub fn new(name: impl Into<String>, seed: Grid, inner: S) -> Self {
        Self { name: name.into(), seed, inner }
    }
}

impl<S: ImageStore> ImageStore for SeededStore<S> {
    fn load(&mut self, name: &str, width: usize, height: usize) -> Result<Vec<u8>> {
        if name != self.name {
            return self.inner.load(name, width, height);
        }
        if (self.seed.width(), self.seed.height()) != (width, height) {
            return Err(Error::ImageSize {
                name: name.to_owned(),
                expected: (width, height),
                found: (self.seed.width(), self.seed.height()),
            });
        }
        Ok(self.seed.to_column_major())
    }

    fn store(&mut self, name: &str, width: usize, height: usize, bytes: &[u8]) -> Result<()> {
        self.inner.store(name, width, height, bytes)
    }
}

enum IoCommand {
    Input {
        name: String,
        width: usize,
        height: usize,
        reply: oneshot::Sender<Result<Vec<u8>>>,
    },
    Output {
        name: String,
        width: usize,
        height: usize,
        bytes: Vec<u8>,
        reply: oneshot::Sender<Result<()>>,
    },
    CheckIdle {
        reply: oneshot::Sender<Result<()>>,
    },
}

/// The distributor's handle on the io task.
///
/// Commands are served strictly in order, so once [`IoHandle::check_idle`]
/// returns every earlier command has been handled by the store.
#[derive(Clone)]
pub struct IoHandle {
    commands: mpsc::Sender<IoCommand>,
}

impl IoHandle {
    /// Runs `store` on a blocking thread until every handle is dropped.
    pub fn spawn<S: ImageStore>(store: S) -> (Self, JoinHandle<()>) {
        let (commands, rx) = mpsc::channel(16);
        let task = tokio::task::spawn_blocking(move || serve(store, rx));
        (Self { commands }, task)
    }

    /// Loads an image, checking it holds exactly `width * height` bytes.
    pub async fn read(&self, name: &str, width: usize, height: usize) -> Result<Vec<u8>> {
        let (reply, response) = oneshot::channel();
        self.send(IoCommand::Input { name: name.to_owned(), width, height, reply }).await?;
        let bytes = response.await.map_err(|_| Error::IoStopped)??;
        if bytes.len() != width * height {
            return Err(Error::ImageSize {
                name: name.to_owned(),
                expected: (width, height),
                found: (bytes.len() / height.max(1), height),
            });
        }
        Ok(bytes)
    }

    /// Writes an image and waits until the store has accepted or refused it.
    pub async fn write(&self, name: &str, width: usize, height: usize, bytes: Vec<u8>) -> Result<()> {
        let (reply, response) = oneshot::channel();
        self.send(IoCommand::Output { name: name.to_owned(), width, height, bytes, reply }).await?;
        response.await.map_err(|_| Error::IoStopped)?
    }

    /// Waits until the io task has served everything sent before it.
    pub async fn check_idle(&self) -> Result<()> {
        let (reply, response) = oneshot::channel();
        self.send(IoCommand::CheckIdle { reply }).await?;
        response.await.map_err(|_| Error::IoStopped)?
    }

    async fn send(&self, command: IoCommand) -> Result<()> {
        self.commands.send(command).await.map_err(|_| Error::IoStopped)
    }
}

fn serve<S: ImageStore>(mut store: S, mut commands: mpsc::Receiver<IoCommand>) {
    while let Some(command) = commands.blocking_recv() {
        match command {
            IoCommand::Input { name, width, height, reply } => {
                let loaded = store.load(&name, width, height);
                debug!(%name, ok = loaded.is_ok(), "image read");
                let _ = reply.send(loaded);
            }
            IoCommand::Output { name, width, height, bytes, reply } => {
                let written = store.store(&name, width, height, &bytes);
                match &written {
                    Ok(()) => debug!(%name, "image written"),
                    Err(err) => error!(%name, %err, "image write failed"),
                }
                let _ = reply.send(written);
            }
            IoCommand::CheckIdle { reply } => {
                let _ = reply.send(Ok(()));
            }
        }
    }
}
