//! Full scenario folder round trip: read, export, re-read.

use std::fs;
use std::path::Path;

use helmet_core::export::export_scenario;
use helmet_core::loading::read_scenario;
use helmet_core::model::AttrValue;

const BASE_NETWORK: &str = "c Modeller - Base Network Transaction\n\
    c Date: 2025-01-01 12:00:00\n\
    c Project: helsinki\n\
    c Scenario 21: baseline\n\
    t nodes\n\
    c   Node  X-coord   Y-coord  Data1  Data2  Data3  Label\n\
    a*  101   25496000  6672000  0      0      0      H\n\
    a   102   25496100  6672000  0      0      0      H\n\
    a   103   25496200  6672000  0      0      0      E\n\
    a   104   25496300  6672000  0      0      0      E\n\
    t links\n\
    c  From  To   Length  Modes  Typ  Lan  VDF  Data1  Data2  Data3\n\
    a  101   102  0.1     c      1    1    1    0      0      0\n\
    a  102   101  0.1     c      1    1    1    0      0      0\n\
    a  102   103  0.15    cb     1    2    1    0      0      0\n";

const EXTRA_LINKS: &str = "t extra_attributes\n\
    @pyoratieluokka LINK 0.0 'pyoratieluokka'\n\
    end extra_attributes\n\
    inode  jnode  @pyoratieluokka\n\
    101    102    2\n\
    102    103    1.5\n";

const TRANSIT_LINES: &str = "c Modeller - Transit Line Transaction\n\
    c Date: 2025-01-01 12:00:00\n\
    c Project: helsinki\n\
    c Scenario 21: baseline\n\
    t lines\n\
    a'1001A1' b 1 10 35 'Eira - Toolo' 0 0 0\n\
    \x20path=no\n\
    \x20 101 dwt=+0.01 ttf=1 us1=0 us2=0 us3=0\n\
    \x20 102 dwt=#0 ttf=1 us1=0 us2=0 us3=0\n\
    \x20 103 lay=0\n\
    c '1001A1'\n";

const EXTRA_TRANSIT_LINES: &str = "t extra_attributes\n\
    @hw_aht TRANSIT_LINE 0.0 ''\n\
    @hw_pt TRANSIT_LINE 0.0 ''\n\
    @hw_iht TRANSIT_LINE 0.0 ''\n\
    end extra_attributes\n\
    line  @hw_aht  @hw_pt  @hw_iht\n\
    '1001A1'  5  10  7.5\n";

const MODES: &str = "c Modeller - Mode Transaction\n\
    c Date: 2025-01-01 12:00:00\n\
    c Project: helsinki\n\
    c Scenario 21: baseline\n\
    t modes\n\
    a 'bus' b 3\n\
    a 'tram' t 2\n";

fn write_fixture(dir: &Path) {
    for (name, content) in [
        ("base_network_21.txt", BASE_NETWORK),
        ("extra_links_21.txt", EXTRA_LINKS),
        ("transit_lines_21.txt", TRANSIT_LINES),
        ("extra_transit_lines_21.txt", EXTRA_TRANSIT_LINES),
        ("modes_21.txt", MODES),
    ] {
        fs::write(dir.join(name), content).unwrap();
    }
}

#[test]
fn scenario_survives_an_export_and_reload() {
    let input = tempfile::tempdir().unwrap();
    write_fixture(input.path());
    let scenario = read_scenario(input.path()).unwrap();

    let output = tempfile::tempdir().unwrap();
    let written = export_scenario(&scenario, output.path()).unwrap();
    assert!(written.iter().all(|p| p.exists()));

    let reloaded = read_scenario(output.path()).unwrap();

    assert_eq!(reloaded.meta.project_name, "helsinki");
    assert_eq!(reloaded.meta.scenario_number, "21");
    assert_eq!(reloaded.meta.scenario_name, "baseline");

    assert_eq!(reloaded.network.node_count(), scenario.network.node_count());
    assert!(reloaded.network.node(101).unwrap().is_centroid);
    assert!(!reloaded.network.node(102).unwrap().is_centroid);

    // The unlinked node is never printed as a link row but comes back
    // as a synthetic orphan.
    let printable = |s: &helmet_core::model::Network| {
        s.links.iter().filter(|l| !l.is_orphan()).count()
    };
    assert_eq!(printable(&reloaded.network), 3);
    assert!(
        reloaded
            .network
            .links
            .iter()
            .any(|l| l.from == 104 && l.is_orphan())
    );

    let attr = |from, to| {
        reloaded
            .network
            .links
            .iter()
            .find(|l| l.from == from && l.to == to)
            .and_then(|l| l.extra.get("@pyoratieluokka"))
            .cloned()
    };
    assert_eq!(attr(101, 102), Some(AttrValue::Real(2.0)));
    assert_eq!(attr(102, 103), Some(AttrValue::Real(1.5)));

    let line = &reloaded.transit.lines[0];
    assert_eq!(line.code, "1001A1");
    assert_eq!(line.description, "Eira - Toolo");
    let hw = line.headways.unwrap();
    assert_eq!((hw.aht, hw.pt, hw.iht), (5.0, 10.0, 7.5));
    let segments: Vec<_> = reloaded.transit.segments_of("1001A1").collect();
    assert_eq!(segments.len(), 3);
    assert_eq!(segments[0].to, Some(102));
    assert_eq!(segments[2].to, None);

    let modes = reloaded.modes.unwrap();
    assert_eq!(modes.marker, "modes");
    assert_eq!(modes.rows, vec!["a 'bus' b 3", "a 'tram' t 2"]);
}

const NETFIELD_TRANSIT_LINES: &str = "t network_fields\n\
    #operaattori TRANSIT_LINE STRING 'operaattori'\n\
    end network_fields\n\
    line      #operaattori\n\
    '1001A1'  'HSL'\n";

const NETFIELD_SEGMENTS: &str = "t network_fields\n\
    #pysakkitunnus TRANSIT_SEGMENT INTEGER32 'pysakkitunnus'\n\
    end network_fields\n\
    line      inode  jnode  #pysakkitunnus\n\
    '1001A1'  101    102    7\n";

// Exporting back over the input folder must not wipe the transit
// netfield tables.
#[test]
fn transit_netfields_survive_export_over_the_input() {
    let dir = tempfile::tempdir().unwrap();
    write_fixture(dir.path());
    fs::write(
        dir.path().join("netfield_transit_lines_21.txt"),
        NETFIELD_TRANSIT_LINES,
    )
    .unwrap();
    fs::write(dir.path().join("netfield_segments_21.txt"), NETFIELD_SEGMENTS).unwrap();

    let scenario = read_scenario(dir.path()).unwrap();
    export_scenario(&scenario, dir.path()).unwrap();

    let lines_file =
        fs::read_to_string(dir.path().join("netfield_transit_lines_21.txt")).unwrap();
    assert!(lines_file.contains("#operaattori TRANSIT_LINE STRING 'operaattori'"));
    assert!(lines_file.contains("'HSL'"));

    let reloaded = read_scenario(dir.path()).unwrap();
    let line = reloaded.transit.line("1001A1").unwrap();
    assert_eq!(
        line.extra.get("#operaattori"),
        Some(&AttrValue::Text("HSL".to_string()))
    );
    let segment = reloaded
        .transit
        .segments_of("1001A1")
        .find(|s| s.node == 101)
        .unwrap();
    assert_eq!(
        segment.extra.get("#pysakkitunnus"),
        Some(&AttrValue::Int(7))
    );
}

#[test]
fn exported_files_share_one_timestamp() {
    let input = tempfile::tempdir().unwrap();
    write_fixture(input.path());
    let scenario = read_scenario(input.path()).unwrap();

    let output = tempfile::tempdir().unwrap();
    export_scenario(&scenario, output.path()).unwrap();

    let date_line = |name: &str| {
        fs::read_to_string(output.path().join(name))
            .unwrap()
            .lines()
            .find(|l| l.starts_with("c Date:"))
            .map(str::to_string)
    };
    let base = date_line("base_network_21.txt").unwrap();
    assert_eq!(date_line("transit_lines_21.txt").unwrap(), base);
    assert_eq!(date_line("modes_21.txt").unwrap(), base);
}
