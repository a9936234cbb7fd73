//! Read-only file handle over a byte region.
//!
//! The embedded bootstrap wraps the archive compiled into the executable in
//! a [`BufferFile`] and hands it to an archive format. Shared mappings of a
//! buffer are zero-copy views of the region; private mappings are copies.

use super::{io_error, read_only_error, seek_position};
use crate::mapping::{MapAccess, MapAddress, MappingProvider, check_bounds};
use crate::translator::{FileStats, VfsFile};
use crate::{Result, VfsError};
use bytes::Bytes;
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::time::SystemTime;

/// Read-only handle over shared bytes.
#[derive(Debug, Clone)]
pub struct BufferFile {
    name: String,
    data: Bytes,
    pos: u64,
}

impl BufferFile {
    /// Wrap `data` under a display name.
    pub fn new(name: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            data: data.into(),
            pos: 0,
        }
    }

    /// Wrap a static region without copying it.
    pub fn from_static(name: impl Into<String>, data: &'static [u8]) -> Self {
        Self::new(name, Bytes::from_static(data))
    }

    /// The underlying bytes.
    pub fn bytes(&self) -> &Bytes {
        &self.data
    }

    /// Display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    fn remaining(&self) -> &[u8] {
        let start = usize::try_from(self.pos)
            .unwrap_or(usize::MAX)
            .min(self.data.len());
        &self.data[start..]
    }
}

impl Read for BufferFile {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let remaining = self.remaining();
        let count = buf.len().min(remaining.len());
        buf[..count].copy_from_slice(&remaining[..count]);
        self.pos += count as u64;
        Ok(count)
    }
}

impl Write for BufferFile {
    fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
        Err(read_only_error(&self.name))
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Seek for BufferFile {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.pos = seek_position(self.pos, self.data.len() as u64, pos)?;
        Ok(self.pos)
    }
}

impl VfsFile for BufferFile {
    fn size(&self) -> Result<u64> {
        Ok(self.data.len() as u64)
    }

    fn set_end(&mut self) -> Result<()> {
        Err(io_error(read_only_error(&self.name), &self.name))
    }

    fn is_readable(&self) -> bool {
        true
    }

    fn is_writable(&self) -> bool {
        false
    }

    fn stats(&self) -> Result<FileStats> {
        Ok(FileStats::file(self.data.len() as u64))
    }

    fn set_times(&mut self, _time: SystemTime) -> Result<()> {
        Err(io_error(read_only_error(&self.name), &self.name))
    }

    fn create_mapping(&self) -> Result<Box<dyn MappingProvider>> {
        Ok(Box::new(StaticMappingProvider {
            data: self.data.clone(),
            regions: Vec::new(),
        }))
    }
}

enum BufferRegion {
    Shared { address: MapAddress, view: Bytes },
    Private { address: MapAddress, copy: Box<[u8]> },
}

impl BufferRegion {
    fn address(&self) -> MapAddress {
        match self {
            Self::Shared { address, .. } | Self::Private { address, .. } => *address,
        }
    }
}

/// Mapping provider over shared bytes.
///
/// Two shared mappings of the same range report the same address; each
/// `unmap` releases one of them.
struct StaticMappingProvider {
    data: Bytes,
    regions: Vec<BufferRegion>,
}

impl MappingProvider for StaticMappingProvider {
    fn map_region(&mut self, offset: u64, len: usize, access: MapAccess) -> Result<MapAddress> {
        check_bounds(offset, len, self.data.len() as u64)?;
        if !access.read {
            return Err(VfsError::AccessDenied(
                "buffer mappings require read access".to_string(),
            ));
        }

        let start = offset as usize;
        let view = self.data.slice(start..start + len);

        let region = if access.private {
            let copy: Box<[u8]> = view.as_ref().into();
            BufferRegion::Private {
                address: MapAddress::of(&copy),
                copy,
            }
        } else {
            BufferRegion::Shared {
                address: MapAddress::of(&view),
                view,
            }
        };

        let address = region.address();
        self.regions.push(region);
        Ok(address)
    }

    fn unmap_region(&mut self, address: MapAddress) -> bool {
        match self.regions.iter().rposition(|r| r.address() == address) {
            Some(index) => {
                self.regions.remove(index);
                true
            }
            None => false,
        }
    }

    fn region(&self, address: MapAddress) -> Option<&[u8]> {
        self.regions
            .iter()
            .rev()
            .find(|r| r.address() == address)
            .map(|region| match region {
                BufferRegion::Shared { view, .. } => &view[..],
                BufferRegion::Private { copy, .. } => &copy[..],
            })
    }

    fn region_mut(&mut self, address: MapAddress) -> Option<&mut [u8]> {
        self.regions
            .iter_mut()
            .rev()
            .find(|r| r.address() == address)
            .and_then(|region| match region {
                BufferRegion::Shared { .. } => None,
                BufferRegion::Private { copy, .. } => Some(&mut copy[..]),
            })
    }

    fn region_count(&self) -> usize {
        self.regions.len()
    }
}
