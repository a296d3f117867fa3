use crate::filters::Filters;
use crate::image::{Image, SplitImage};
use crate::sector::RAW_CD_SECTOR_SIZE;
use blindwrite_format::datafile::DataFileRecord;
use blindwrite_format::ErrorKind;
use blindwrite_format::session::SubchannelMode;
use snafu::{OptionExt, Snafu};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Geometry of one data-file record, known before the file is opened.
#[derive(Debug, Clone)]
pub(crate) struct DataFileInfo {
    pub index: usize,
    pub filename: String,
    pub start_lba: i64,
    pub sectors: u64,
    /// Bytes per stored sector, subchannel included.
    pub sector_size: u64,
    pub subchannel: SubchannelMode,
    pub offset: u64,
}

impl DataFileInfo {
    /// Derives sector size and subchannel layout from a record.
    pub fn new(index: usize, record: &DataFileRecord) -> Result<Self, GeometryError> {
        let sectors = record.sectors() as u64;
        let sector_size = record.length().checked_div(sectors).unwrap_or(0);
        let subchannel = match sector_size.saturating_sub(RAW_CD_SECTOR_SIZE as u64) {
            0 => SubchannelMode::None,
            16 => SubchannelMode::Q16,
            96 => SubchannelMode::Packed,
            _ => {
                return UnsupportedSubchannelSizeSnafu {
                    file: record.filename(),
                    sector_size,
                }
                .fail();
            }
        };

        Ok(Self {
            index,
            filename: record.base_filename().to_owned(),
            start_lba: record.start_lba() as i64,
            sectors,
            sector_size,
            subchannel,
            offset: record.offset(),
        })
    }

    pub fn contains(&self, lba: i64) -> bool {
        lba >= self.start_lba && lba < self.start_lba + self.sectors as i64
    }

    /// Returns `true` if every sector of `lba..lba + sectors` is in this file.
    pub fn covers(&self, lba: i64, sectors: u64) -> bool {
        self.contains(lba) && lba + sectors as i64 <= self.start_lba + self.sectors as i64
    }
}

/// Error when a data-file record has an unusable sector size.
#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum GeometryError {
    #[snafu(display(
        "data file {file} has {sector_size}-byte sectors, which is not a supported subchannel layout"
    ))]
    UnsupportedSubchannelSize { file: String, sector_size: u64 },
}

/// An opened data file with the geometry needed to locate sectors.
#[derive(Clone)]
pub(crate) struct DataFile {
    pub image: Arc<dyn Image>,
    pub start_lba: i64,
    pub sectors: u64,
    pub sector_size: u64,
    pub subchannel: SubchannelMode,
    pub offset: u64,
}

impl DataFile {
    fn new(image: Arc<dyn Image>, info: &DataFileInfo) -> Self {
        Self {
            image,
            start_lba: info.start_lba,
            sectors: info.sectors,
            sector_size: info.sector_size,
            subchannel: info.subchannel,
            offset: info.offset,
        }
    }

    /// Returns the byte position of `lba` inside the file, or [`None`] if
    /// `lba` precedes the first stored sector.
    pub fn byte_offset(&self, lba: i64) -> Option<u64> {
        let rel = u64::try_from(lba.checked_sub(self.start_lba)?).ok()?;

        rel.checked_mul(self.sector_size)?.checked_add(self.offset)
    }
}

impl std::fmt::Debug for DataFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataFile")
            .field("len", &self.image.len())
            .field("start_lba", &self.start_lba)
            .field("sectors", &self.sectors)
            .field("sector_size", &self.sector_size)
            .field("subchannel", &self.subchannel)
            .finish_non_exhaustive()
    }
}

/// Error when no backing file can be found.
#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum ResolveError {
    #[snafu(display("no data file covers LBA {lba} and no split volumes were found"))]
    NoSuchFile { lba: i64 },

    #[snafu(display("data file record #{index} does not exist"))]
    NoSuchRecord { index: usize },
}

impl ResolveError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NoSuchFile { .. } => ErrorKind::NoSuchFile,
            Self::NoSuchRecord { .. } => ErrorKind::NoData,
        }
    }
}

enum State {
    /// Files opened so far, keyed by record index.
    PerFile(HashMap<usize, Arc<dyn Image>>),
    /// Split volumes joined into one stream that serves every read.
    Joined(DataFile),
}

/// Locates and opens data files on first use.
pub(crate) struct Resolver {
    filters: Arc<dyn Filters>,
    image_dir: PathBuf,
    base_name: String,
    /// Extension of the first split volume (`b5i` or `b6i`).
    first_extension: &'static str,
    data_path: String,
    files: Vec<DataFileInfo>,
    state: Mutex<State>,
}

impl Resolver {
    pub fn new(
        filters: Arc<dyn Filters>,
        image_path: &Path,
        first_extension: &'static str,
        data_path: &str,
        files: Vec<DataFileInfo>,
    ) -> Self {
        let image_dir = image_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        let base_name = image_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();

        Self {
            filters,
            image_dir,
            base_name,
            first_extension,
            data_path: normalize_data_path(data_path),
            files,
            state: Mutex::new(State::PerFile(HashMap::new())),
        }
    }

    pub fn files(&self) -> &[DataFileInfo] {
        &self.files
    }

    /// Opens the data file of record `index`.
    ///
    /// Falls back to joining split volumes when the file cannot be found.
    pub fn resolve(&self, index: usize) -> Result<DataFile, ResolveError> {
        let info = self.files.get(index).context(NoSuchRecordSnafu { index })?;
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());

        self.open(&mut state, Some(info), info.start_lba)
    }

    /// Opens the data file holding `lba..lba + sectors`.
    ///
    /// Falls back to joining split volumes when no single record covers the
    /// range.
    pub fn resolve_range(&self, lba: i64, sectors: u64) -> Result<DataFile, ResolveError> {
        let covering = self.files.iter().find(|f| f.covers(lba, sectors));
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());

        self.open(&mut state, covering, lba)
    }

    /// Once joined, the joined stream serves every later request.
    fn open(
        &self,
        state: &mut State,
        info: Option<&DataFileInfo>,
        lba: i64,
    ) -> Result<DataFile, ResolveError> {
        let cache = match &mut *state {
            State::Joined(file) => return Ok(file.clone()),
            State::PerFile(cache) => cache,
        };

        if let Some(info) = info {
            if let Some(image) = cache.get(&info.index) {
                return Ok(DataFile::new(image.clone(), info));
            }

            if let Some(image) = self.open_first(&self.candidates(&info.filename)) {
                cache.insert(info.index, image.clone());
                return Ok(DataFile::new(image, info));
            }

            log::warn!(
                "Cannot find data file {}, looking for split volumes",
                info.filename
            );
        } else {
            log::warn!("No data file covers LBA {lba}, looking for split volumes");
        }

        // The joined stream begins with the lowest addressed record.
        let base = self
            .files
            .iter()
            .min_by_key(|f| (f.start_lba, f.offset))
            .context(NoSuchFileSnafu { lba })?;
        let image = self.join_split_volumes().context(NoSuchFileSnafu { lba })?;
        let mut file = DataFile::new(image, base);

        if file.sector_size > 0 {
            file.sectors = file.image.len().saturating_sub(file.offset) / file.sector_size;
        }

        *state = State::Joined(file.clone());
        Ok(file)
    }

    /// Returns every path a data file may live at, in lookup order.
    fn candidates(&self, filename: &str) -> Vec<PathBuf> {
        let transforms: [fn(&str) -> String; 3] = [str::to_owned, str::to_lowercase, str::to_uppercase];
        let mut out: Vec<PathBuf> = Vec::new();
        let mut push = |path: PathBuf| {
            if !out.contains(&path) {
                out.push(path);
            }
        };

        for name in &transforms {
            for dir in &transforms {
                push(self.image_dir.join(dir(&self.data_path)).join(name(filename)));
            }
        }

        for name in &transforms {
            push(self.image_dir.join(name(filename)));
        }

        out
    }

    fn open_first(&self, candidates: &[PathBuf]) -> Option<Arc<dyn Image>> {
        candidates.iter().find_map(|path| {
            let image = self.filters.open(path)?;
            log::debug!("Resolved data file {}", path.display());
            Some(image)
        })
    }

    /// Joins `base.b5i`/`base.b6i` (if present) and `base.b00`, `base.b01`, ...
    fn join_split_volumes(&self) -> Option<Arc<dyn Image>> {
        for first_volume in ["b00", "B00"] {
            let name = format!("{}.{first_volume}", self.base_name);

            for path in self.candidates(&name) {
                let Some(volume) = self.filters.open(&path) else {
                    continue;
                };

                let dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
                let prefix = &first_volume[..1];
                let mut segments = Vec::new();

                let first = [
                    self.first_extension.to_owned(),
                    self.first_extension.to_uppercase(),
                ];

                if let Some(image) = first
                    .iter()
                    .find_map(|ext| self.filters.open(&dir.join(format!("{}.{ext}", self.base_name))))
                {
                    segments.push(image);
                }

                segments.push(volume);

                for n in 1.. {
                    let next = dir.join(format!("{}.{prefix}{n:02}", self.base_name));

                    match self.filters.open(&next) {
                        Some(image) => segments.push(image),
                        None => break,
                    }
                }

                let joined = SplitImage::new(segments);

                log::debug!(
                    "Joined {} split volume(s) starting at {}",
                    joined.segment_count(),
                    path.display()
                );

                return Some(Arc::new(joined));
            }
        }

        None
    }
}

/// Converts a stored Windows directory into a path relative to the image.
fn normalize_data_path(path: &str) -> String {
    let path = path.replace('\\', "/");
    let path = match path.split_once(':') {
        Some((drive, rest)) if drive.len() == 1 => rest.to_owned(),
        _ => path,
    };

    path.trim_start_matches('/').to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filters::MemoryFilters;
    use blindwrite_format::datafile::DataFileBuilder;

    fn info(name: &str, start: i32, sectors: u32, sector_size: u32) -> DataFileInfo {
        let record = DataFileBuilder::new(name)
            .start_lba(start)
            .sectors(sectors)
            .length(sectors * sector_size)
            .build();

        DataFileInfo::new(0, &record).unwrap()
    }

    fn resolver(filters: MemoryFilters, data_path: &str, files: Vec<DataFileInfo>) -> Resolver {
        Resolver::new(
            Arc::new(filters),
            Path::new("/img/disc.b5t"),
            "b5i",
            data_path,
            files,
        )
    }

    #[test]
    fn infers_subchannel_from_sector_size() {
        assert_eq!(info("a", 0, 10, 2352).subchannel, SubchannelMode::None);
        assert_eq!(info("a", 0, 10, 2368).subchannel, SubchannelMode::Q16);
        assert_eq!(info("a", 0, 10, 2448).subchannel, SubchannelMode::Packed);
        assert_eq!(info("a", 0, 10, 2048).subchannel, SubchannelMode::None);

        let record = DataFileBuilder::new("bad.b5i")
            .sectors(10)
            .length(10 * 2400)
            .build();
        assert!(DataFileInfo::new(0, &record).is_err());
    }

    #[test]
    fn coverage_includes_negative_start() {
        let file = info("x.b5i", -150, 300, 2352);

        assert!(file.contains(-150));
        assert!(file.contains(149));
        assert!(!file.contains(150));
        assert!(!file.contains(-151));
        assert!(file.covers(-150, 300));
        assert!(!file.covers(-150, 301));
    }

    #[test]
    fn candidate_order() {
        let r = resolver(MemoryFilters::new(), "C:\\Dump\\", vec![]);
        let paths = r.candidates("Disc.B5I");

        assert_eq!(paths[0], Path::new("/img/Dump/Disc.B5I"));
        assert_eq!(paths[1], Path::new("/img/dump/Disc.B5I"));
        assert_eq!(paths[2], Path::new("/img/DUMP/Disc.B5I"));
        assert_eq!(paths[3], Path::new("/img/Dump/disc.b5i"));
        assert!(paths.contains(&PathBuf::from("/img/disc.b5i")));
        assert_eq!(paths.last().unwrap(), Path::new("/img/DISC.B5I"));

        let unique: std::collections::HashSet<_> = paths.iter().collect();
        assert_eq!(unique.len(), paths.len());
    }

    #[test]
    fn finds_lowercased_file() {
        let mut filters = MemoryFilters::new();
        filters.insert("/img/disc.b5i", vec![0; 2352 * 4]);

        let r = resolver(filters, "", vec![info("DISC.B5I", 0, 4, 2352)]);
        let file = r.resolve(0).unwrap();

        assert_eq!(file.image.len(), 2352 * 4);
        assert_eq!(file.byte_offset(2), Some(2352 * 2));
        assert_eq!(file.byte_offset(-1), None);
    }

    #[test]
    fn missing_file_is_no_such_file() {
        let r = resolver(MemoryFilters::new(), "", vec![info("disc.b5i", 0, 4, 2352)]);
        assert!(matches!(r.resolve(0), Err(ResolveError::NoSuchFile { .. })));
    }

    #[test]
    fn joins_split_volumes_once() {
        let mut filters = MemoryFilters::new();
        filters.insert("/img/disc.B00", vec![1; 2352]);
        filters.insert("/img/disc.B01", vec![2; 2352]);
        filters.insert("/img/disc.B02", vec![3; 2352]);

        let r = resolver(filters, "", vec![info("disc.b5i", 0, 3, 2352)]);
        let first = r.resolve_range(0, 3).unwrap();
        let second = r.resolve_range(1, 1).unwrap();

        assert_eq!(first.image.len(), 3 * 2352);
        assert!(Arc::ptr_eq(&first.image, &second.image));

        let mut buf = [0u8; 4];
        first.image.read_exact_at(2352 * 2 - 2, &mut buf).unwrap();
        assert_eq!(buf, [2, 2, 3, 3]);
    }

    #[test]
    fn joined_stream_starts_at_lowest_record() {
        let mut filters = MemoryFilters::new();
        let mut first = vec![0u8; 2352 * 4];
        first[2352..2352 * 2].fill(1);
        let mut second = vec![4u8; 2352 * 4];
        second[2352..2352 * 2].fill(5);
        filters.insert("/img/disc.b00", first);
        filters.insert("/img/disc.b01", second);

        let mut low = info("disc.b5i", 0, 4, 2352);
        let mut high = info("disc.b5i", 4, 4, 2352);
        low.index = 0;
        high.index = 1;
        high.offset = 4 * 2352;

        // Join through the later record, then read the earlier one.
        let r = resolver(filters, "", vec![low, high]);
        let later = r.resolve(1).unwrap();
        let earlier = r.resolve_range(1, 1).unwrap();

        assert_eq!(later.start_lba, 0);
        assert_eq!(later.offset, 0);
        assert_eq!(later.sectors, 8);
        assert_eq!(earlier.byte_offset(1), Some(2352));
        assert_eq!(earlier.byte_offset(5), Some(5 * 2352));
        assert_eq!(earlier.byte_offset(-1), None);

        let mut buf = [0u8; 1];
        earlier.image.read_exact_at(earlier.byte_offset(5).unwrap(), &mut buf).unwrap();
        assert_eq!(buf, [5]);
    }

    #[test]
    fn unknown_record_is_reported() {
        let r = resolver(MemoryFilters::new(), "", vec![]);
        let err = r.resolve(3).unwrap_err();

        assert!(matches!(err, ResolveError::NoSuchRecord { index: 3 }));
        assert_eq!(err.kind(), ErrorKind::NoData);
    }

    #[test]
    fn first_volume_precedes_numbered_volumes() {
        let mut filters = MemoryFilters::new();
        filters.insert("/img/disc.b5i", vec![9; 10]);
        filters.insert("/img/disc.b00", vec![1; 10]);

        let r = resolver(filters, "", vec![info("other.b5i", 0, 1, 2352)]);
        let file = r.resolve(0).unwrap();
        let mut buf = [0u8; 2];
        file.image.read_exact_at(9, &mut buf).unwrap();

        assert_eq!(file.image.len(), 20);
        assert_eq!(buf, [9, 1]);
    }

    #[test]
    fn data_path_is_made_relative() {
        assert_eq!(normalize_data_path("C:\\Images\\Game\\"), "Images/Game/");
        assert_eq!(normalize_data_path("\\\\share\\x"), "share/x");
        assert_eq!(normalize_data_path(""), "");
    }
}
