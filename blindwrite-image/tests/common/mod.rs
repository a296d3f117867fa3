//! Builders for synthetic images written to a temporary directory.
#![allow(dead_code)]

use blindwrite_format::datafile::DataFileBuilder;
use blindwrite_format::header::Profile;
use blindwrite_format::session::{SessionDescriptor, TrackDescriptorBuilder, TrackType};
use blindwrite_format::{Descriptor, DescriptorBuilder};
use blindwrite_image::checksum::edc;
use blindwrite_image::sector::{RAW_CD_SECTOR_SIZE, SYNC};
use std::path::PathBuf;
use tempfile::TempDir;

pub fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// An image on disk. The directory is removed on drop.
pub struct Fixture {
    pub dir: TempDir,
    pub path: PathBuf,
}

impl Fixture {
    /// Writes `descriptor` as `name` plus each `(file name, contents)` pair.
    pub fn write(name: &str, descriptor: &Descriptor, files: &[(&str, Vec<u8>)]) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(name);

        std::fs::write(&path, descriptor.to_bytes()).unwrap();

        for (file, data) in files {
            let target = dir.path().join(file);

            if let Some(parent) = target.parent() {
                std::fs::create_dir_all(parent).unwrap();
            }

            std::fs::write(target, data).unwrap();
        }

        Self { dir, path }
    }

    pub fn open(&self) -> std::sync::Arc<blindwrite_image::Disc> {
        blindwrite_image::open(&self.path).unwrap()
    }
}

/// Byte stored at position `i` of the user data of sector `lba`.
pub fn pattern(lba: u32, i: usize) -> u8 {
    (lba as usize * 7 + i) as u8
}

/// Builds a raw 2352-byte frame of `kind` for sector `lba` with a valid EDC.
pub fn frame(kind: TrackType, lba: u32) -> Vec<u8> {
    let mut f = vec![0u8; RAW_CD_SECTOR_SIZE];

    if kind == TrackType::Audio {
        for (i, b) in f.iter_mut().enumerate() {
            *b = pattern(lba, i);
        }

        return f;
    }

    f[..12].copy_from_slice(&SYNC);
    f[12..15].copy_from_slice(&[(lba >> 16) as u8, (lba >> 8) as u8, lba as u8]);

    let (user, edc_range) = match kind {
        TrackType::Mode1 => {
            f[15] = 1;
            (16..2064, 0..2064)
        }
        TrackType::Mode2Form2 => {
            f[15] = 2;
            f[16..24].copy_from_slice(&[0, 0, 0x20, 0, 0, 0, 0x20, 0]);
            (24..2348, 16..2348)
        }
        _ => {
            f[15] = 2;
            f[16..24].copy_from_slice(&[0, 0, 0x08, 0, 0, 0, 0x08, 0]);
            (24..2072, 16..2072)
        }
    };

    for (i, b) in f[user].iter_mut().enumerate() {
        *b = pattern(lba, i);
    }

    let at = edc_range.end;
    let value = edc(&f[edc_range]).to_le_bytes();
    f[at..at + 4].copy_from_slice(&value);
    f
}

/// Builds `sectors` frames starting at `lba`, each followed by `subchannel`.
pub fn frames(kind: TrackType, lba: u32, sectors: u32, subchannel: &[u8]) -> Vec<u8> {
    (lba..lba + sectors)
        .flat_map(|n| {
            let mut f = frame(kind, n);
            f.extend_from_slice(subchannel);
            f
        })
        .collect()
}

/// Builds a one-session disc whose tracks are `(kind, sectors)` pairs laid
/// out back to back from LBA 0, all stored in one data file.
pub fn disc(
    profile: Profile,
    file: &str,
    sector_size: u32,
    tracks: &[(TrackType, u32)],
) -> Descriptor {
    let mut descriptors = vec![TrackDescriptorBuilder::new(TrackType::NotData, 0xA0).build()];
    let mut lba = 0u32;

    for (i, &(kind, sectors)) in tracks.iter().enumerate() {
        descriptors.push(
            TrackDescriptorBuilder::new(kind, i as u8 + 1)
                .start_lba(lba as i32)
                .sectors(sectors)
                .build(),
        );
        lba += sectors;
    }

    DescriptorBuilder::new(profile)
        .data_file(
            DataFileBuilder::new(file)
                .length(lba * sector_size)
                .sectors(lba)
                .build(),
        )
        .session(SessionDescriptor::new(
            1,
            0,
            lba as i32 - 1,
            1,
            tracks.len() as u16,
            descriptors,
        ))
        .build()
}

/// Writes a single-track disc of `kind` with its data file next to it.
pub fn single_track(kind: TrackType, sectors: u32) -> Fixture {
    let descriptor = disc(Profile::CdRom, "disc.b5i", 2352, &[(kind, sectors)]);
    let data = frames(kind, 0, sectors, &[]);

    Fixture::write("disc.b5t", &descriptor, &[("disc.b5i", data)])
}
