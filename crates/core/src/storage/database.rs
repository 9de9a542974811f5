use crate::error::{IndexError, Result};
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, RwLock};
use symdex_api::RecordId;
use tracing::{debug, info, trace, warn};

pub const CHUNK_SIZE: usize = 16 * 1024;
pub const MAGIC: u32 = 0x5359_4458;
pub const VERSION: u32 = 1;

/// Fixed fields of chunk 0.
pub mod header {
    pub const MAGIC: u32 = 0;
    pub const VERSION: u32 = 4;
    pub const TAIL: u32 = 8;
    pub const LINKAGES: u32 = 12;
    pub const UNITS: u32 = 16;
    pub const FREE_LISTS: u32 = 64;
}

const SIZE_CLASSES: u32 = (CHUNK_SIZE / 8) as u32 + 1;
pub const DATA_START: u32 = align8(header::FREE_LISTS + SIZE_CLASSES * 4);

const BLOCK_HEADER: u32 = 2;
const IN_USE: u16 = 0x8000;
const MIN_BLOCK: u32 = 16;
// Links of a block sitting on a free list, right after its header.
const FREE_NEXT: u32 = 2;
const FREE_PREV: u32 = 6;

const fn align8(value: u32) -> u32 {
    (value + 7) & !7
}

struct Chunk {
    bytes: Box<[u8]>,
    dirty: bool,
}

impl Chunk {
    fn zeroed() -> Self {
        Self {
            bytes: vec![0u8; CHUNK_SIZE].into_boxed_slice(),
            dirty: true,
        }
    }
}

struct Inner {
    chunks: Vec<Option<Chunk>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DatabaseStats {
    pub chunks: usize,
    pub allocated_bytes: u64,
    pub free_bytes: u64,
}

/// Chunked record store backed by a single file.
///
/// Records are addressed by their byte offset in the file. Chunks are read
/// lazily and written back on [`Database::flush`].
pub struct Database {
    path: PathBuf,
    file: Mutex<File>,
    inner: RwLock<Inner>,
    alloc_lock: Mutex<()>,
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database").field("path", &self.path).finish()
    }
}

impl Database {
    /// Open an existing index file, or initialise an empty one.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;
        let len = file.metadata()?.len();

        if len == 0 {
            let mut first = Chunk::zeroed();
            first.bytes[0..4].copy_from_slice(&MAGIC.to_le_bytes());
            first.bytes[4..8].copy_from_slice(&VERSION.to_le_bytes());
            first.bytes[8..12].copy_from_slice(&DATA_START.to_le_bytes());
            info!("Created index file {}", path.display());
            return Ok(Self::with_chunks(path, file, vec![Some(first)]));
        }

        if len % CHUNK_SIZE as u64 != 0 {
            return Err(IndexError::corrupt(format!(
                "file length {} is not a multiple of the chunk size",
                len
            )));
        }
        let count = (len / CHUNK_SIZE as u64) as usize;
        let db = Self::with_chunks(path, file, (0..count).map(|_| None).collect());

        let magic = db.get_u32(header::MAGIC)?;
        if magic != MAGIC {
            return Err(IndexError::VersionMismatch {
                found: magic,
                expected: MAGIC,
            });
        }
        let version = db.get_u32(header::VERSION)?;
        if version != VERSION {
            return Err(IndexError::VersionMismatch {
                found: version,
                expected: VERSION,
            });
        }
        info!("Opened index file {} ({} chunks)", path.display(), count);
        Ok(db)
    }

    /// Like [`Database::open`], but discards a file of another format.
    pub fn open_or_create(path: &Path) -> Result<Self> {
        match Self::open(path) {
            Err(err @ (IndexError::VersionMismatch { .. } | IndexError::Corrupt(_))) => {
                warn!("Index at {} is unusable ({}). Will rebuild.", path.display(), err);
                std::fs::remove_file(path)?;
                Self::open(path)
            }
            other => other,
        }
    }

    fn with_chunks(path: &Path, file: File, chunks: Vec<Option<Chunk>>) -> Self {
        Self {
            path: path.to_path_buf(),
            file: Mutex::new(file),
            inner: RwLock::new(Inner { chunks }),
            alloc_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn chunk_count(&self) -> Result<usize> {
        Ok(self.inner.read().map_err(|_| IndexError::Poisoned)?.chunks.len())
    }

    // ---- Raw access ----

    fn locate(addr: u32, len: usize) -> Result<(usize, usize)> {
        let chunk = addr as usize / CHUNK_SIZE;
        let offset = addr as usize % CHUNK_SIZE;
        if offset + len > CHUNK_SIZE {
            return Err(IndexError::corrupt(format!(
                "access of {} bytes at {:#x} crosses a chunk boundary",
                len, addr
            )));
        }
        Ok((chunk, offset))
    }

    fn load_chunk<'i>(&self, inner: &'i mut Inner, index: usize) -> Result<&'i mut Chunk> {
        let slot = inner.chunks.get_mut(index).ok_or_else(|| {
            IndexError::corrupt(format!("chunk {} is beyond the end of the index", index))
        })?;
        if slot.is_none() {
            let mut bytes = vec![0u8; CHUNK_SIZE].into_boxed_slice();
            let mut file = self.file.lock().map_err(|_| IndexError::Poisoned)?;
            file.seek(SeekFrom::Start((index * CHUNK_SIZE) as u64))?;
            file.read_exact(&mut bytes)?;
            trace!("Loaded chunk {}", index);
            *slot = Some(Chunk {
                bytes,
                dirty: false,
            });
        }
        match slot {
            Some(chunk) => Ok(chunk),
            None => Err(IndexError::corrupt("chunk failed to load")),
        }
    }

    fn read<R>(&self, addr: u32, len: usize, f: impl FnOnce(&[u8]) -> R) -> Result<R> {
        let (index, offset) = Self::locate(addr, len)?;
        {
            let inner = self.inner.read().map_err(|_| IndexError::Poisoned)?;
            match inner.chunks.get(index) {
                None => {
                    return Err(IndexError::corrupt(format!(
                        "address {:#x} is beyond the end of the index",
                        addr
                    )));
                }
                Some(Some(chunk)) => return Ok(f(&chunk.bytes[offset..offset + len])),
                Some(None) => {}
            }
        }
        let mut inner = self.inner.write().map_err(|_| IndexError::Poisoned)?;
        let chunk = self.load_chunk(&mut inner, index)?;
        Ok(f(&chunk.bytes[offset..offset + len]))
    }

    fn write(&self, addr: u32, data: &[u8]) -> Result<()> {
        let (index, offset) = Self::locate(addr, data.len())?;
        let mut inner = self.inner.write().map_err(|_| IndexError::Poisoned)?;
        let chunk = self.load_chunk(&mut inner, index)?;
        chunk.bytes[offset..offset + data.len()].copy_from_slice(data);
        chunk.dirty = true;
        Ok(())
    }

    // ---- Typed accessors ----

    pub fn get_u8(&self, addr: u32) -> Result<u8> {
        self.read(addr, 1, |b| b[0])
    }

    pub fn get_u16(&self, addr: u32) -> Result<u16> {
        self.read(addr, 2, |b| u16::from_le_bytes([b[0], b[1]]))
    }

    pub fn get_u32(&self, addr: u32) -> Result<u32> {
        self.read(addr, 4, |b| {
            let mut raw = [0u8; 4];
            raw.copy_from_slice(b);
            u32::from_le_bytes(raw)
        })
    }

    pub fn get_u64(&self, addr: u32) -> Result<u64> {
        self.read(addr, 8, |b| {
            let mut raw = [0u8; 8];
            raw.copy_from_slice(b);
            u64::from_le_bytes(raw)
        })
    }

    pub fn get_i64(&self, addr: u32) -> Result<i64> {
        Ok(self.get_u64(addr)? as i64)
    }

    pub fn get_rec(&self, addr: u32) -> Result<RecordId> {
        Ok(RecordId(self.get_u32(addr)?))
    }

    pub fn get_bytes(&self, addr: u32, len: usize) -> Result<Vec<u8>> {
        self.read(addr, len, |b| b.to_vec())
    }

    pub fn put_u8(&self, addr: u32, value: u8) -> Result<()> {
        self.write(addr, &[value])
    }

    pub fn put_u16(&self, addr: u32, value: u16) -> Result<()> {
        self.write(addr, &value.to_le_bytes())
    }

    pub fn put_u32(&self, addr: u32, value: u32) -> Result<()> {
        self.write(addr, &value.to_le_bytes())
    }

    pub fn put_u64(&self, addr: u32, value: u64) -> Result<()> {
        self.write(addr, &value.to_le_bytes())
    }

    pub fn put_i64(&self, addr: u32, value: i64) -> Result<()> {
        self.put_u64(addr, value as u64)
    }

    pub fn put_rec(&self, addr: u32, value: RecordId) -> Result<()> {
        self.put_u32(addr, value.0)
    }

    pub fn put_bytes(&self, addr: u32, data: &[u8]) -> Result<()> {
        self.write(addr, data)
    }

    // ---- Allocation ----

    /// Allocate a zeroed record with room for `size` bytes.
    pub fn malloc(&self, size: usize) -> Result<RecordId> {
        let raw = size + BLOCK_HEADER as usize;
        if raw > CHUNK_SIZE {
            return Err(IndexError::TooLarge(size));
        }
        let need = align8(raw as u32).max(MIN_BLOCK);

        let _guard = self.alloc_lock.lock().map_err(|_| IndexError::Poisoned)?;
        let (block, block_size) = match self.take_free(need)? {
            Some(found) => found,
            None => (self.carve(need)?, need),
        };
        self.put_u16(block, block_size as u16 | IN_USE)?;
        self.write(
            block + BLOCK_HEADER,
            &vec![0u8; (block_size - BLOCK_HEADER) as usize],
        )?;
        Ok(RecordId(block + BLOCK_HEADER))
    }

    /// Return a record's block to the free lists.
    pub fn free(&self, record: RecordId) -> Result<()> {
        if record.is_null() {
            return Ok(());
        }
        let block = self.block_of(record)?;
        let _guard = self.alloc_lock.lock().map_err(|_| IndexError::Poisoned)?;
        let head = self.get_u16(block)?;
        if head & IN_USE == 0 {
            return Err(IndexError::corrupt(format!("double free of {}", record)));
        }
        let size = (head & !IN_USE) as u32;
        if size < MIN_BLOCK || size % 8 != 0 {
            return Err(IndexError::corrupt(format!(
                "bad block header {:#x} at {}",
                head, record
            )));
        }
        self.push_free(block, size)
    }

    pub fn is_allocated(&self, record: RecordId) -> Result<bool> {
        let block = self.block_of(record)?;
        Ok(self.get_u16(block)? & IN_USE != 0)
    }

    /// Usable bytes of an allocated record.
    pub fn record_capacity(&self, record: RecordId) -> Result<usize> {
        let block = self.block_of(record)?;
        let head = self.get_u16(block)?;
        Ok(((head & !IN_USE) as u32 - BLOCK_HEADER) as usize)
    }

    fn block_of(&self, record: RecordId) -> Result<u32> {
        match record.0.checked_sub(BLOCK_HEADER) {
            Some(block) if block >= DATA_START => Ok(block),
            _ => Err(IndexError::corrupt(format!("{} is not a record", record))),
        }
    }

    fn free_head_addr(class: u32) -> u32 {
        header::FREE_LISTS + class * 4
    }

    fn take_free(&self, need: u32) -> Result<Option<(u32, u32)>> {
        let exact = need / 8;
        let head = self.get_u32(Self::free_head_addr(exact))?;
        if head != 0 {
            self.unlink_free(exact, head)?;
            return Ok(Some((head, need)));
        }

        // Split a larger block; the remainder goes back to its own list.
        for class in exact + 1..SIZE_CLASSES {
            let head = self.get_u32(Self::free_head_addr(class))?;
            if head == 0 {
                continue;
            }
            self.unlink_free(class, head)?;
            let size = class * 8;
            let rest = size - need;
            if rest >= MIN_BLOCK {
                self.push_free(head + need, rest)?;
                return Ok(Some((head, need)));
            }
            return Ok(Some((head, size)));
        }
        Ok(None)
    }

    fn carve(&self, need: u32) -> Result<u32> {
        let tail = self.get_u32(header::TAIL)?;
        let chunk_end = (tail / CHUNK_SIZE as u32)
            .checked_add(1)
            .and_then(|n| n.checked_mul(CHUNK_SIZE as u32))
            .ok_or_else(|| IndexError::corrupt("index exceeds the addressable size"))?;

        let mut block = tail;
        if tail + need > chunk_end {
            let rest = chunk_end - tail;
            if rest >= MIN_BLOCK {
                self.push_free(tail, rest)?;
            }
            block = chunk_end;
        }
        let end = block
            .checked_add(need)
            .ok_or_else(|| IndexError::corrupt("index exceeds the addressable size"))?;
        self.ensure_chunk(((end - 1) / CHUNK_SIZE as u32) as usize)?;
        self.put_u32(header::TAIL, end)?;
        Ok(block)
    }

    fn ensure_chunk(&self, index: usize) -> Result<()> {
        let mut inner = self.inner.write().map_err(|_| IndexError::Poisoned)?;
        while inner.chunks.len() <= index {
            inner.chunks.push(Some(Chunk::zeroed()));
            debug!("Appended chunk {}", inner.chunks.len() - 1);
        }
        Ok(())
    }

    fn push_free(&self, block: u32, size: u32) -> Result<()> {
        let class = size / 8;
        let head = self.get_u32(Self::free_head_addr(class))?;
        self.put_u16(block, size as u16)?;
        self.put_u32(block + FREE_NEXT, head)?;
        self.put_u32(block + FREE_PREV, 0)?;
        if head != 0 {
            self.put_u32(head + FREE_PREV, block)?;
        }
        self.put_u32(Self::free_head_addr(class), block)
    }

    fn unlink_free(&self, class: u32, block: u32) -> Result<()> {
        let next = self.get_u32(block + FREE_NEXT)?;
        let prev = self.get_u32(block + FREE_PREV)?;
        if prev == 0 {
            self.put_u32(Self::free_head_addr(class), next)?;
        } else {
            self.put_u32(prev + FREE_NEXT, next)?;
        }
        if next != 0 {
            self.put_u32(next + FREE_PREV, prev)?;
        }
        Ok(())
    }

    // ---- Persistence ----

    /// Write dirty chunks back to the file.
    pub fn flush(&self, sync: bool) -> Result<()> {
        let mut inner = self.inner.write().map_err(|_| IndexError::Poisoned)?;
        let mut file = self.file.lock().map_err(|_| IndexError::Poisoned)?;
        let mut written = 0usize;
        for (index, slot) in inner.chunks.iter_mut().enumerate() {
            if let Some(chunk) = slot {
                if chunk.dirty {
                    file.seek(SeekFrom::Start((index * CHUNK_SIZE) as u64))?;
                    file.write_all(&chunk.bytes)?;
                    chunk.dirty = false;
                    written += 1;
                }
            }
        }
        if sync {
            file.sync_all()?;
        }
        debug!("Flushed {} chunks to {}", written, self.path.display());
        Ok(())
    }

    pub fn stats(&self) -> Result<DatabaseStats> {
        let chunks = self.chunk_count()?;
        let mut free_bytes = 0u64;
        for class in 2..SIZE_CLASSES {
            let mut block = self.get_u32(Self::free_head_addr(class))?;
            let mut guard = 0usize;
            while block != 0 {
                free_bytes += (class * 8) as u64;
                block = self.get_u32(block + FREE_NEXT)?;
                guard += 1;
                if guard > chunks * CHUNK_SIZE / MIN_BLOCK as usize {
                    return Err(IndexError::corrupt("cycle in free list"));
                }
            }
        }
        let tail = self.get_u32(header::TAIL)? as u64;
        Ok(DatabaseStats {
            chunks,
            allocated_bytes: (tail - DATA_START as u64).saturating_sub(free_bytes),
            free_bytes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_malloc_returns_zeroed_distinct_records() {
        let dir = tempdir().unwrap();
        let db = Database::open(&dir.path().join("db")).unwrap();
        let a = db.malloc(10).unwrap();
        let b = db.malloc(10).unwrap();
        assert_ne!(a, b);
        assert!(a.0 >= DATA_START);
        assert_eq!(db.get_u64(a.0).unwrap(), 0);
        db.put_u64(a.0, 42).unwrap();
        assert_eq!(db.get_u64(a.0).unwrap(), 42);
        assert_eq!(db.get_u64(b.0).unwrap(), 0);
    }

    #[test]
    fn test_freed_block_is_reused() {
        let dir = tempdir().unwrap();
        let db = Database::open(&dir.path().join("db")).unwrap();
        let a = db.malloc(30).unwrap();
        db.put_u32(a.0, 7).unwrap();
        db.free(a).unwrap();
        let b = db.malloc(30).unwrap();
        assert_eq!(a, b);
        assert_eq!(db.get_u32(b.0).unwrap(), 0);
    }

    #[test]
    fn test_large_free_block_is_split() {
        let dir = tempdir().unwrap();
        let db = Database::open(&dir.path().join("db")).unwrap();
        let big = db.malloc(200).unwrap();
        let _fence = db.malloc(8).unwrap();
        db.free(big).unwrap();

        let small = db.malloc(20).unwrap();
        assert_eq!(small, big);
        let second = db.malloc(20).unwrap();
        assert!(second.0 > small.0 && second.0 < big.0 + 200);
    }

    #[test]
    fn test_double_free_is_detected() {
        let dir = tempdir().unwrap();
        let db = Database::open(&dir.path().join("db")).unwrap();
        let a = db.malloc(16).unwrap();
        db.free(a).unwrap();
        assert!(matches!(db.free(a), Err(IndexError::Corrupt(_))));
    }

    #[test]
    fn test_blocks_never_cross_chunks() {
        let dir = tempdir().unwrap();
        let db = Database::open(&dir.path().join("db")).unwrap();
        for _ in 0..100 {
            let rec = db.malloc(1000).unwrap();
            let start = (rec.0 - BLOCK_HEADER) as usize;
            assert_eq!(start / CHUNK_SIZE, (start + 1001) / CHUNK_SIZE);
        }
        assert!(db.chunk_count().unwrap() > 1);
        assert!(matches!(db.malloc(CHUNK_SIZE), Err(IndexError::TooLarge(_))));
    }

    #[test]
    fn test_flush_and_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("db");
        let rec = {
            let db = Database::open(&path).unwrap();
            let rec = db.malloc(64).unwrap();
            db.put_bytes(rec.0, b"symdex").unwrap();
            for _ in 0..40 {
                db.malloc(900).unwrap();
            }
            db.flush(true).unwrap();
            rec
        };
        let db = Database::open(&path).unwrap();
        assert_eq!(db.get_bytes(rec.0, 6).unwrap(), b"symdex");
        assert!(db.is_allocated(rec).unwrap());
        let stats = db.stats().unwrap();
        assert!(stats.allocated_bytes > 36_000);
    }

    #[test]
    fn test_foreign_file_is_rejected_then_rebuilt() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("db");
        std::fs::write(&path, vec![0xAB; CHUNK_SIZE]).unwrap();
        assert!(matches!(
            Database::open(&path),
            Err(IndexError::VersionMismatch { .. })
        ));
        let db = Database::open_or_create(&path).unwrap();
        assert_eq!(db.get_u32(header::MAGIC).unwrap(), MAGIC);
    }
}
