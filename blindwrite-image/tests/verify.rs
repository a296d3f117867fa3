mod common;

use blindwrite_format::DescriptorBuilder;
use blindwrite_format::datafile::DataFileBuilder;
use blindwrite_format::header::Profile;
use blindwrite_format::session::{SessionDescriptor, TrackDescriptorBuilder, TrackType};
use blindwrite_image::{ErrorKind, OpenOptions, SectorChecker, VerifyStatus};
use common::*;

#[test]
fn intact_mode1_track_passes() {
    init();
    let fixture = single_track(TrackType::Mode1, 8);
    let disc = fixture.open();

    assert_eq!(disc.verify_sector(3).unwrap(), VerifyStatus::Pass);

    let report = disc.verify_sectors(0, 8).unwrap();
    assert_eq!(report.status(), VerifyStatus::Pass);
    assert!(report.failing.is_empty());
}

#[test]
fn corrupt_sector_fails() {
    init();
    let kind = TrackType::Mode1;
    let descriptor = disc(Profile::CdRom, "disc.b5i", 2352, &[(kind, 4)]);
    let mut data = frames(kind, 0, 4, &[]);
    data[2 * 2352 + 500] ^= 0xFF;

    let fixture = Fixture::write("disc.b5t", &descriptor, &[("disc.b5i", data)]);
    let disc = fixture.open();

    assert_eq!(disc.verify_sector(2).unwrap(), VerifyStatus::Fail);

    let report = disc.verify_sectors(0, 4).unwrap();
    assert_eq!(report.status(), VerifyStatus::Fail);
    assert_eq!(report.failing, [2]);
}

#[test]
fn one_unchecked_sector_makes_range_indeterminate() {
    init();
    let kind = TrackType::Mode2Form2;
    let descriptor = disc(Profile::CdRom, "disc.b5i", 2352, &[(kind, 5)]);
    let mut data = frames(kind, 0, 5, &[]);

    // A zero Form 2 EDC means "not computed".
    data[3 * 2352 + 2348..3 * 2352 + 2352].fill(0);

    let fixture = Fixture::write("disc.b5t", &descriptor, &[("disc.b5i", data)]);
    let disc = fixture.open();
    let report = disc.verify_sectors(0, 5).unwrap();

    assert_eq!(report.status(), VerifyStatus::Indeterminate);
    assert_eq!(report.unknown, [3]);
    assert!(report.failing.is_empty());
}

#[test]
fn range_may_span_tracks() {
    init();
    let descriptor = disc(
        Profile::CdRom,
        "disc.b5i",
        2352,
        &[(TrackType::Mode1, 3), (TrackType::Audio, 2)],
    );
    let mut data = frames(TrackType::Mode1, 0, 3, &[]);
    data.extend(frames(TrackType::Audio, 3, 2, &[]));

    let fixture = Fixture::write("disc.b5t", &descriptor, &[("disc.b5i", data)]);
    let disc = fixture.open();
    let report = disc.verify_sectors(1, 4).unwrap();

    assert_eq!(report.status(), VerifyStatus::Indeterminate);
    assert_eq!(report.unknown, [3, 4]);
}

#[test]
fn pregap_between_tracks_is_unknown() {
    init();
    let kind = TrackType::Mode1;

    // Track 2 starts at LBA 4 with a two-sector pregap, so 4 and 5 belong to no track.
    let descriptor = DescriptorBuilder::new(Profile::CdRom)
        .data_file(
            DataFileBuilder::new("disc.b5i")
                .length(10 * 2352)
                .sectors(10)
                .build(),
        )
        .session(SessionDescriptor::new(
            1,
            0,
            9,
            1,
            2,
            vec![
                TrackDescriptorBuilder::new(kind, 1).sectors(4).build(),
                TrackDescriptorBuilder::new(kind, 2)
                    .start_lba(4)
                    .pregap(2)
                    .sectors(6)
                    .build(),
            ],
        ))
        .build();

    let fixture = Fixture::write("disc.b5t", &descriptor, &[("disc.b5i", frames(kind, 0, 10, &[]))]);
    let disc = fixture.open();
    let report = disc.verify_sectors(0, 10).unwrap();

    assert_eq!(report.status(), VerifyStatus::Indeterminate);
    assert_eq!(report.unknown, [4, 5]);
    assert!(report.failing.is_empty());
    assert_eq!(disc.verify_sector(5).unwrap(), VerifyStatus::Indeterminate);
    assert_eq!(disc.verify_sector(6).unwrap(), VerifyStatus::Pass);
}

#[test]
fn unreadable_data_file_is_unknown() {
    init();
    let descriptor = disc(Profile::CdRom, "gone.b5i", 2352, &[(TrackType::Mode1, 3)]);
    let fixture = Fixture::write("disc.b5t", &descriptor, &[]);
    let disc = fixture.open();
    let report = disc.verify_sectors(0, 3).unwrap();

    assert_eq!(report.status(), VerifyStatus::Indeterminate);
    assert_eq!(report.unknown, [0, 1, 2]);
}

#[test]
fn range_past_the_disc_is_rejected() {
    init();
    let fixture = single_track(TrackType::Mode1, 4);
    let disc = fixture.open();

    let err = disc.verify_sectors(1, u64::MAX).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::OutOfRange);

    let err = disc.verify_sectors(2, 3).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::OutOfRange);

    assert_eq!(disc.verify_sector(4).unwrap_err().kind(), ErrorKind::OutOfRange);
}

struct Reject;

impl SectorChecker for Reject {
    fn check(&self, _: &[u8]) -> Option<bool> {
        Some(false)
    }
}

#[test]
fn checker_is_injectable() {
    init();
    let fixture = single_track(TrackType::Mode1, 2);
    let disc = OpenOptions::new().checker(Reject).open(&fixture.path).unwrap();

    assert_eq!(disc.verify_sector(0).unwrap(), VerifyStatus::Fail);
}
