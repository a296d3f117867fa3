use blindwrite_format::DescriptorBuilder;
use blindwrite_format::datafile::DataFileBuilder;
use blindwrite_format::header::Profile;
use blindwrite_format::session::{SessionDescriptor, TrackDescriptorBuilder, TrackType};
use blindwrite_image::checksum::edc;
use blindwrite_image::sector::SYNC;
use blindwrite_image::VerifyStatus;
use blindwrite_util::{DiscExporter, ExportError, SilentProgress, hex, open_disc};
use sha2::{Digest, Sha256};
use tempfile::TempDir;

const SECTORS: u32 = 300;

fn mode1_frame(lba: u32) -> Vec<u8> {
    let mut f = vec![0u8; 2352];
    f[..12].copy_from_slice(&SYNC);
    f[15] = 1;

    for (i, b) in f[16..2064].iter_mut().enumerate() {
        *b = (lba as usize + i) as u8;
    }

    let value = edc(&f[..2064]).to_le_bytes();
    f[2064..2068].copy_from_slice(&value);
    f
}

/// Writes a one-track Mode 1 image with a PMA block.
fn write_image(dir: &TempDir) -> std::path::PathBuf {
    let descriptor = DescriptorBuilder::new(Profile::CdRom)
        .pma(vec![0; 11])
        .data_file(
            DataFileBuilder::new("disc.b5i")
                .length(SECTORS * 2352)
                .sectors(SECTORS)
                .build(),
        )
        .session(SessionDescriptor::new(
            1,
            0,
            SECTORS as i32 - 1,
            1,
            1,
            vec![
                TrackDescriptorBuilder::new(TrackType::Mode1, 1)
                    .sectors(SECTORS)
                    .build(),
            ],
        ))
        .build();

    let data: Vec<u8> = (0..SECTORS).flat_map(mode1_frame).collect();
    let path = dir.path().join("disc.b5t");

    std::fs::write(&path, descriptor.to_bytes()).unwrap();
    std::fs::write(dir.path().join("disc.b5i"), data).unwrap();
    path
}

#[test]
fn dump_hash_and_verify() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_image(&dir);
    let disc = unsafe { open_disc(&path) }.unwrap();
    let exporter = DiscExporter::new(&disc, SilentProgress, false);

    let out = dir.path().join("track01.bin");
    let written = exporter.dump_track(1, &out, false).unwrap();
    let dumped = std::fs::read(&out).unwrap();
    assert_eq!(written, SECTORS as u64 * 2048);
    assert_eq!(&dumped[..2048], &mode1_frame(0)[16..2064]);

    // Refuses to overwrite without force.
    let err = exporter.dump_track(1, &out, true).unwrap_err();
    assert!(matches!(err, ExportError::CreateFileFailed { .. }));

    let digest = exporter.hash_track(1).unwrap();
    assert_eq!(hex(&digest), hex(&Sha256::digest(&dumped)));

    let report = exporter.verify().unwrap();
    assert_eq!(report.status(), VerifyStatus::Pass);

    assert!(matches!(
        exporter.hash_track(2).unwrap_err(),
        ExportError::NoSuchTrack { track: 2 }
    ));
}

#[test]
fn long_dump_with_force() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_image(&dir);
    let disc = unsafe { open_disc(&path) }.unwrap();
    let out = dir.path().join("track01.raw");

    std::fs::write(&out, b"stale").unwrap();

    let exporter = DiscExporter::new(&disc, SilentProgress, true);
    let written = exporter.dump_track(1, &out, true).unwrap();

    assert_eq!(written, SECTORS as u64 * 2352);
    assert_eq!(std::fs::read(&out).unwrap()[2352..4704], mode1_frame(1)[..]);
}

#[test]
fn exports_available_tags() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_image(&dir);
    let disc = unsafe { open_disc(&path) }.unwrap();
    let exporter = DiscExporter::new(&disc, SilentProgress, false);

    let out = dir.path().join("tags");
    let written = exporter.export_tags(&out).unwrap();
    let names: Vec<String> = written
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();

    assert_eq!(names, ["pma.bin", "full_toc.bin"]);
    assert_eq!(std::fs::read(out.join("pma.bin")).unwrap(), [0; 11]);
}
