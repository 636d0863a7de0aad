//! EVENTLOG - Write-Ahead Log (WAL)
//! Provides durability by logging every registration and tombstone to disk
//! before it is applied to the in-memory slot table.

use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Read, Write};
use std::path::{Path, PathBuf};

use bytes::{Buf, BufMut, BytesMut};
use serde::{Deserialize, Serialize};

use crate::error::{EventLogError, Result};
use crate::types::{Event, EventId};

/// Length prefix plus trailing CRC.
const FRAME_OVERHEAD: usize = 8;

/// A single logged mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum WalRecord {
    /// A new event occupying the slot `event.id`.
    Register(Event),
    /// The slot for this id became a tombstone.
    Tombstone(EventId),
}

/// Records recovered from disk and the byte length they span.
#[derive(Debug)]
pub struct Recovered {
    pub records: Vec<WalRecord>,
    pub valid_len: u64,
    pub file_len: u64,
}

impl Recovered {
    /// Returns true if a torn tail was found past the last valid record.
    pub fn has_torn_tail(&self) -> bool {
        self.valid_len < self.file_len
    }
}

/// Write-Ahead Log for crash recovery and durability.
///
/// ## Binary Format (per record)
/// ```text
/// [payload_len: 4 bytes (LE)][payload: bincode(WalRecord), N bytes][crc32(payload): 4 bytes (LE)]
/// ```
pub struct WriteAheadLog {
    /// Path to the WAL file on disk.
    path: PathBuf,
    /// File handle opened for appending.
    file: File,
    /// fsync after every append.
    sync_writes: bool,
    /// Byte length covered by acknowledged appends.
    committed_len: u64,
    /// Set when a failed append could not be rolled back.
    failed: bool,
}

impl WriteAheadLog {
    /// Open or create a WAL file at the specified path.
    pub fn open(path: PathBuf, sync_writes: bool) -> Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        let committed_len = file.metadata()?.len();

        Ok(Self {
            path,
            file,
            sync_writes,
            committed_len,
            failed: false,
        })
    }

    /// Byte length covered by acknowledged appends.
    pub fn committed_len(&self) -> u64 {
        self.committed_len
    }

    /// Encode one record into its framed binary form.
    fn encode(record: &WalRecord, buf: &mut BytesMut) -> Result<()> {
        let payload = bincode::serialize(record)?;
        let len = u32::try_from(payload.len())
            .map_err(|_| EventLogError::Serialization("WAL record exceeds 4 GiB".to_string()))?;

        buf.reserve(payload.len() + FRAME_OVERHEAD);
        buf.put_u32_le(len);
        buf.put_slice(&payload);
        buf.put_u32_le(crc32fast::hash(&payload));
        Ok(())
    }

    /// Append a single record.
    pub fn append(&mut self, record: &WalRecord) -> Result<()> {
        self.append_all(std::slice::from_ref(record))
    }

    /// Append several records with a single write and a single fsync.
    ///
    /// On a write or fsync error the file is cut back to its last committed
    /// length, so a partial frame never sits in front of later records. If
    /// that rollback fails too, every later append is refused.
    pub fn append_all(&mut self, records: &[WalRecord]) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }
        if self.failed {
            return Err(EventLogError::WalFailed(format!(
                "{:?} could not be rolled back after an earlier write error",
                self.path
            )));
        }

        let mut buf = BytesMut::new();
        for record in records {
            Self::encode(record, &mut buf)?;
        }

        self.discard_uncommitted()?;

        if let Err(err) = self.write_frames(&buf) {
            self.rollback();
            return Err(err.into());
        }

        self.committed_len += buf.len() as u64;
        Ok(())
    }

    fn write_frames(&mut self, buf: &[u8]) -> std::io::Result<()> {
        self.file.write_all(buf)?;
        if self.sync_writes {
            self.file.sync_all()?;
        }
        Ok(())
    }

    /// Cut bytes past the committed length left by an interrupted write.
    fn discard_uncommitted(&mut self) -> Result<()> {
        let on_disk = self.file.metadata()?.len();
        if on_disk == self.committed_len {
            return Ok(());
        }
        if on_disk < self.committed_len {
            self.failed = true;
            return Err(EventLogError::Corruption(format!(
                "{:?} shrank to {} bytes below {} committed",
                self.path, on_disk, self.committed_len
            )));
        }

        log::warn!(
            "Discarding {} uncommitted bytes at the end of {:?}",
            on_disk - self.committed_len,
            self.path
        );
        if let Err(err) = self.file.set_len(self.committed_len) {
            self.failed = true;
            return Err(err.into());
        }
        Ok(())
    }

    fn rollback(&mut self) {
        match self.file.set_len(self.committed_len) {
            Ok(()) => log::warn!(
                "Rolled {:?} back to {} bytes after a failed append",
                self.path,
                self.committed_len
            ),
            Err(err) => {
                log::error!("Rollback of {:?} failed, refusing further appends: {}", self.path, err);
                self.failed = true;
            }
        }
    }

    /// Read every intact record from the WAL at `path`.
    ///
    /// A missing file recovers as empty. An incomplete or checksum-failing
    /// record at the very end is a torn write and ends recovery there; a
    /// checksum failure followed by more data is reported as corruption.
    pub fn recover(path: &Path) -> Result<Recovered> {
        let mut data = Vec::new();
        match File::open(path) {
            Ok(mut file) => {
                file.read_to_end(&mut data)?;
            }
            Err(err) if err.kind() == ErrorKind::NotFound => {}
            Err(err) => return Err(err.into()),
        }

        let file_len = data.len() as u64;
        let mut records = Vec::new();
        let mut offset = 0usize;
        let mut cursor = &data[..];

        while cursor.remaining() >= FRAME_OVERHEAD {
            let len = (&cursor[..4]).get_u32_le() as usize;
            let frame_len = len + FRAME_OVERHEAD;
            if cursor.remaining() < frame_len {
                break;
            }

            let payload = &cursor[4..4 + len];
            let stored_crc = (&cursor[4 + len..frame_len]).get_u32_le();
            if crc32fast::hash(payload) != stored_crc {
                if cursor.remaining() > frame_len {
                    return Err(EventLogError::Corruption(format!(
                        "CRC mismatch in WAL record at byte {}",
                        offset
                    )));
                }
                break;
            }

            let record: WalRecord = bincode::deserialize(payload).map_err(|err| {
                EventLogError::RecoveryFailed(format!("undecodable record at byte {}: {}", offset, err))
            })?;
            records.push(record);

            cursor.advance(frame_len);
            offset += frame_len;
        }

        Ok(Recovered {
            records,
            valid_len: offset as u64,
            file_len,
        })
    }

    /// Cut the WAL at `path` back to `len` bytes, dropping a torn tail.
    pub fn truncate_to(path: &Path, len: u64) -> Result<()> {
        let file = OpenOptions::new().write(true).open(path)?;
        file.set_len(len)?;
        file.sync_all()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn sample_event(id: EventId) -> Event {
        Event {
            id,
            timestamp: Utc.timestamp_opt(1605107095, 0).unwrap(),
            flags: vec![7, 5],
            data: r#"{"location":"FR"}"#.to_string(),
        }
    }

    #[test]
    fn test_recover_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let recovered = WriteAheadLog::recover(&dir.path().join("absent.wal")).unwrap();
        assert!(recovered.records.is_empty());
        assert!(!recovered.has_torn_tail());
    }

    #[test]
    fn test_append_then_recover() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.wal");

        let mut wal = WriteAheadLog::open(path.clone(), true).unwrap();
        wal.append_all(&[
            WalRecord::Register(sample_event(1)),
            WalRecord::Register(sample_event(2)),
        ])
        .unwrap();
        wal.append(&WalRecord::Tombstone(1)).unwrap();
        drop(wal);

        let recovered = WriteAheadLog::recover(&path).unwrap();
        assert_eq!(
            recovered.records,
            vec![
                WalRecord::Register(sample_event(1)),
                WalRecord::Register(sample_event(2)),
                WalRecord::Tombstone(1),
            ]
        );
        assert!(!recovered.has_torn_tail());
    }

    #[test]
    fn test_torn_tail_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("torn.wal");

        let mut wal = WriteAheadLog::open(path.clone(), true).unwrap();
        wal.append(&WalRecord::Register(sample_event(1))).unwrap();
        drop(wal);

        // half-written length prefix of a second record
        let mut file = OpenOptions::new().append(true).open(&path).unwrap();
        file.write_all(&[0x10, 0x00]).unwrap();
        drop(file);

        let recovered = WriteAheadLog::recover(&path).unwrap();
        assert_eq!(recovered.records.len(), 1);
        assert!(recovered.has_torn_tail());

        WriteAheadLog::truncate_to(&path, recovered.valid_len).unwrap();
        let again = WriteAheadLog::recover(&path).unwrap();
        assert!(!again.has_torn_tail());
    }

    #[test]
    fn test_stray_bytes_are_cut_before_next_append() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stray.wal");

        let mut wal = WriteAheadLog::open(path.clone(), true).unwrap();
        wal.append(&WalRecord::Register(sample_event(1))).unwrap();
        let committed = wal.committed_len();

        // leftover of an interrupted write
        let mut other = OpenOptions::new().append(true).open(&path).unwrap();
        other.write_all(&[0x40, 0x00, 0x00]).unwrap();
        drop(other);

        wal.append(&WalRecord::Tombstone(1)).unwrap();
        assert!(wal.committed_len() > committed);
        assert_eq!(std::fs::metadata(&path).unwrap().len(), wal.committed_len());
        drop(wal);

        let recovered = WriteAheadLog::recover(&path).unwrap();
        assert_eq!(
            recovered.records,
            vec![WalRecord::Register(sample_event(1)), WalRecord::Tombstone(1)]
        );
        assert!(!recovered.has_torn_tail());
    }

    #[test]
    fn test_shrunk_file_refuses_appends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shrunk.wal");

        let mut wal = WriteAheadLog::open(path.clone(), true).unwrap();
        wal.append(&WalRecord::Register(sample_event(1))).unwrap();

        OpenOptions::new().write(true).open(&path).unwrap().set_len(2).unwrap();

        let first = wal.append(&WalRecord::Tombstone(1));
        assert!(matches!(first, Err(EventLogError::Corruption(_))));
        let second = wal.append(&WalRecord::Tombstone(1));
        assert!(matches!(second, Err(EventLogError::WalFailed(_))));
    }

    #[test]
    fn test_mid_log_corruption_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("corrupt.wal");

        let mut wal = WriteAheadLog::open(path.clone(), true).unwrap();
        wal.append(&WalRecord::Register(sample_event(1))).unwrap();
        wal.append(&WalRecord::Register(sample_event(2))).unwrap();
        drop(wal);

        // flip a payload byte of the first record
        let mut bytes = std::fs::read(&path).unwrap();
        bytes[6] ^= 0xFF;
        std::fs::write(&path, bytes).unwrap();

        let result = WriteAheadLog::recover(&path);
        assert!(matches!(result, Err(EventLogError::Corruption(_))));
    }
}
