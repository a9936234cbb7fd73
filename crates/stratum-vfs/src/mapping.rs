//! Memory mapping extension
//!
//! A [`MappingExtension`] is owned by a [`FileEngine`](crate::FileEngine)
//! next to its file handle. It creates the handle's [`MappingProvider`] on
//! the first `map` call and reuses it afterwards. Releasing the extension
//! destroys the provider and with it every outstanding region, which must
//! happen before the handle itself is dropped.

use crate::translator::VfsFile;
use crate::{Result, VfsError};
use bitflags::bitflags;
use memmap2::{Mmap, MmapMut, MmapOptions};
use std::collections::BTreeMap;
use std::fmt;
use std::fs::File;
use tracing::{debug, warn};

bitflags! {
    /// Caller options for a mapping request.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct MapFlags: u32 {
        /// Copy-on-write: writes stay private to the mapping.
        const PRIVATE = 0x0001;
    }
}

/// Access of a mapped region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MapAccess {
    /// Region may be read.
    pub read: bool,
    /// Region may be written.
    pub write: bool,
    /// Writes do not reach the backing file.
    pub private: bool,
}

impl MapAccess {
    /// Derive the access for a handle: its own readability and writability
    /// plus the caller's private flag.
    pub fn for_handle(file: &dyn VfsFile, flags: MapFlags) -> Self {
        Self {
            read: file.is_readable(),
            write: file.is_writable(),
            private: flags.contains(MapFlags::PRIVATE),
        }
    }
}

/// Start address of a mapped region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MapAddress(pub usize);

impl MapAddress {
    /// Address of the first byte of `bytes`.
    pub fn of(bytes: &[u8]) -> Self {
        Self(bytes.as_ptr() as usize)
    }
}

impl fmt::Display for MapAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// Creates and destroys mapped views of one open file.
///
/// Dropping the provider releases every region it still holds.
pub trait MappingProvider: Send {
    /// Map `len` bytes starting at `offset`.
    fn map_region(&mut self, offset: u64, len: usize, access: MapAccess) -> Result<MapAddress>;

    /// Release a region. Returns `false` if `address` is not mapped.
    fn unmap_region(&mut self, address: MapAddress) -> bool;

    /// View a mapped region.
    fn region(&self, address: MapAddress) -> Option<&[u8]>;

    /// Mutable view of a writable region.
    fn region_mut(&mut self, address: MapAddress) -> Option<&mut [u8]>;

    /// Number of live regions.
    fn region_count(&self) -> usize;
}

/// Reject empty regions and regions past the end of the backing data.
pub fn check_bounds(offset: u64, len: usize, total: u64) -> Result<()> {
    if len == 0 {
        return Err(VfsError::Mapping("cannot map an empty region".to_string()));
    }

    let end = offset
        .checked_add(len as u64)
        .ok_or_else(|| VfsError::Mapping("region end overflows".to_string()))?;

    if end > total {
        return Err(VfsError::Mapping(format!(
            "region {offset}+{len} exceeds backing length {total}"
        )));
    }

    Ok(())
}

/// Lazily created mapping provider slot of a file engine.
#[derive(Default)]
pub struct MappingExtension {
    provider: Option<Box<dyn MappingProvider>>,
}

impl fmt::Debug for MappingExtension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MappingExtension")
            .field(
                "regions",
                &self.provider.as_ref().map_or(0, |p| p.region_count()),
            )
            .finish()
    }
}

impl MappingExtension {
    /// Empty slot; no provider until the first `map`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Map a region of `file`, creating the provider on first use.
    pub fn map(
        &mut self,
        file: &dyn VfsFile,
        offset: u64,
        len: usize,
        flags: MapFlags,
    ) -> Result<MapAddress> {
        let access = MapAccess::for_handle(file, flags);

        if self.provider.is_none() {
            let created = file.create_mapping().inspect_err(|e| {
                warn!("Failed to create mapping provider: {e}");
            })?;
            self.provider = Some(created);
        }
        let provider = self.provider.as_mut().ok_or(VfsError::NotOpen)?;

        let address = provider.map_region(offset, len, access)?;
        debug!("Mapped {len} bytes at offset {offset} to {address}");
        Ok(address)
    }

    /// Release a region; `false` if nothing is mapped at `address`.
    pub fn unmap(&mut self, address: MapAddress) -> bool {
        self.provider
            .as_mut()
            .is_some_and(|provider| provider.unmap_region(address))
    }

    /// View a mapped region.
    pub fn region(&self, address: MapAddress) -> Option<&[u8]> {
        self.provider.as_ref()?.region(address)
    }

    /// Mutable view of a writable region.
    pub fn region_mut(&mut self, address: MapAddress) -> Option<&mut [u8]> {
        self.provider.as_mut()?.region_mut(address)
    }

    /// Whether a provider has been created.
    pub fn is_active(&self) -> bool {
        self.provider.is_some()
    }

    /// Number of live regions.
    pub fn region_count(&self) -> usize {
        self.provider.as_ref().map_or(0, |p| p.region_count())
    }

    /// Destroy the provider and every region it holds.
    pub fn release(&mut self) {
        if let Some(provider) = self.provider.take() {
            debug!(
                "Releasing mapping provider with {} live regions",
                provider.region_count()
            );
        }
    }
}

enum MmapRegion {
    ReadOnly(Mmap),
    Writable(MmapMut),
}

impl MmapRegion {
    fn bytes(&self) -> &[u8] {
        match self {
            Self::ReadOnly(map) => &map[..],
            Self::Writable(map) => &map[..],
        }
    }
}

/// Mapping provider over a native file using `memmap2`.
pub struct MmapProvider {
    file: File,
    regions: BTreeMap<MapAddress, MmapRegion>,
}

impl MmapProvider {
    /// Bind a provider to `file`.
    ///
    /// The provider keeps its own descriptor so that region lifetime does
    /// not depend on the engine's handle.
    pub fn new(file: &File) -> Result<Self> {
        Ok(Self {
            file: file.try_clone()?,
            regions: BTreeMap::new(),
        })
    }
}

impl MappingProvider for MmapProvider {
    fn map_region(&mut self, offset: u64, len: usize, access: MapAccess) -> Result<MapAddress> {
        let total = self.file.metadata()?.len();
        check_bounds(offset, len, total)?;

        let mut options = MmapOptions::new();
        options.offset(offset).len(len);

        // Mapped files may be modified by other handles; views are exposed
        // only through borrows of the provider.
        #[allow(unsafe_code)]
        let region = unsafe {
            if access.private {
                if !access.read {
                    return Err(VfsError::AccessDenied(
                        "private mapping requires read access".to_string(),
                    ));
                }
                MmapRegion::Writable(options.map_copy(&self.file)?)
            } else if access.write {
                MmapRegion::Writable(options.map_mut(&self.file)?)
            } else if access.read {
                MmapRegion::ReadOnly(options.map(&self.file)?)
            } else {
                return Err(VfsError::AccessDenied(
                    "handle is neither readable nor writable".to_string(),
                ));
            }
        };

        let address = MapAddress::of(region.bytes());
        self.regions.insert(address, region);
        Ok(address)
    }

    fn unmap_region(&mut self, address: MapAddress) -> bool {
        match self.regions.remove(&address) {
            Some(MmapRegion::Writable(map)) => {
                if let Err(e) = map.flush() {
                    warn!("Failed to flush mapping at {address}: {e}");
                }
                true
            }
            Some(MmapRegion::ReadOnly(_)) => true,
            None => false,
        }
    }

    fn region(&self, address: MapAddress) -> Option<&[u8]> {
        self.regions.get(&address).map(MmapRegion::bytes)
    }

    fn region_mut(&mut self, address: MapAddress) -> Option<&mut [u8]> {
        match self.regions.get_mut(&address)? {
            MmapRegion::Writable(map) => Some(&mut map[..]),
            MmapRegion::ReadOnly(_) => None,
        }
    }

    fn region_count(&self) -> usize {
        self.regions.len()
    }
}
