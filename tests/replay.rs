//! End-to-end replay scenarios over synthetic dissected captures.

use anyhow::Result;
use bmp_replay::fields::{names, FieldMap, FieldSource};
use bmp_replay::ingest::{ingest_frames, Frame};
use bmp_replay::{
    AnalyzerConfig, BgpPduType, MessageType, MonitoringType, PeerId, PeerType, ReplayAnalyzer,
    RouteState,
};

const ZERO_RD: &str = "00:00:00:00:00:00:00:00";
const PEER_A: &str = "192.0.2.1";

fn boxed(fields: FieldMap) -> Box<dyn FieldSource> {
    Box::new(fields)
}

fn initiation() -> Box<dyn FieldSource> {
    boxed(
        FieldMap::new()
            .with(names::MESSAGE_TYPE, "4")
            .with(names::BMP_VERSION, "3"),
    )
}

fn peer_header(msg_type: MessageType, address: &str) -> FieldMap {
    FieldMap::new()
        .with(names::MESSAGE_TYPE, (msg_type as u8).to_string())
        .with(names::PEER_TYPE, "0")
        .with(names::PEER_IPV4_ADDR, address)
        .with(names::PEER_DISTINGUISHER, ZERO_RD)
}

fn peer_up(address: &str) -> Box<dyn FieldSource> {
    boxed(peer_header(MessageType::PeerUp, address))
}

fn peer_down(address: &str) -> Box<dyn FieldSource> {
    boxed(peer_header(MessageType::PeerDown, address))
}

fn route_update(address: &str, prefix: &str, prefix_len: &str) -> Box<dyn FieldSource> {
    boxed(
        peer_header(MessageType::RouteMonitoring, address)
            .with(names::WITHDRAWN_ROUTES_LENGTH, "0")
            .with(names::PATH_ATTRIBUTES_LENGTH, "30")
            .with(names::PATH_ATTRIBUTE_TYPE_CODE, "1")
            .with(names::NLRI_PREFIX, prefix)
            .with(names::NLRI_PREFIX_LENGTH, prefix_len)
            .with("bgp_update_path_attribute_origin", "0")
            .with("bgp_update_path_attribute_as_path", "65000"),
    )
}

fn route_withdraw(address: &str, prefix: &str, prefix_len: &str) -> Box<dyn FieldSource> {
    boxed(
        peer_header(MessageType::RouteMonitoring, address)
            .with(names::WITHDRAWN_ROUTES_LENGTH, "4")
            .with(names::PATH_ATTRIBUTES_LENGTH, "0")
            .with(names::WITHDRAWN_PREFIX, prefix)
            .with(names::WITHDRAWN_PREFIX_LENGTH, prefix_len),
    )
}

fn end_of_rib(address: &str) -> Box<dyn FieldSource> {
    boxed(
        peer_header(MessageType::RouteMonitoring, address)
            .with(names::WITHDRAWN_ROUTES_LENGTH, "0")
            .with(names::PATH_ATTRIBUTES_LENGTH, "0"),
    )
}

fn peer_a() -> PeerId {
    PeerId {
        peer_type: PeerType::GlobalInstance,
        peer_address: PEER_A.to_string(),
        route_distinguisher: ZERO_RD.to_string(),
    }
}

fn run(frames: Vec<Frame>) -> Result<ReplayAnalyzer> {
    let _ = env_logger::builder().is_test(true).try_init();
    let messages = ingest_frames(frames)?;

    // sequencing law: the assigned sequences are exactly {0..N-1}
    let sequences: Vec<u64> = messages.iter().map(|m| m.sequence()).collect();
    assert_eq!(sequences, (0..messages.len() as u64).collect::<Vec<_>>());

    let mut analyzer = ReplayAnalyzer::new(AnalyzerConfig::default());
    analyzer.analyze(&messages)?;
    Ok(analyzer)
}

#[test]
fn test_single_peer_up_update_withdraw_down() -> Result<()> {
    let analyzer = run(vec![
        vec![initiation(), peer_up(PEER_A)],
        vec![
            route_update(PEER_A, "10.0.0.0", "24"),
            route_withdraw(PEER_A, "10.0.0.0", "24"),
        ],
        vec![peer_down(PEER_A)],
    ])?;

    // session: one up, one down, no duplicates, ends down
    let record = analyzer.sessions().peer(&peer_a()).unwrap();
    assert_eq!(record.state, Some(MessageType::PeerDown));
    assert_eq!(record.counter("PeerUp"), 1);
    assert_eq!(record.counter("PeerDown"), 1);
    assert_eq!(record.counter("PeerUp_duplicate"), 0);
    assert_eq!(record.counter("PeerDown_duplicate"), 0);
    assert_eq!(record.counter("RouteMonitoring"), 2);
    assert_eq!(record.state_transitions, vec![1, 4]);

    // rib: one entry with the full history
    let scope = analyzer
        .ribs()
        .scope(&peer_a(), MonitoringType::AdjInPre)
        .unwrap();
    assert_eq!(scope.len(), 1);
    let entry = scope.get("10.0.0.0/24, id=0, rd=").unwrap();
    assert_eq!(entry.update_count, 1);
    assert_eq!(entry.withdraw_count, 1);
    assert_eq!(entry.duplicate_withdraw_count, 0);
    assert_eq!(entry.last_state, Some(RouteState::Down));
    assert_eq!(
        entry.timeline,
        vec![(2, BgpPduType::Update), (3, BgpPduType::Withdraw)]
    );
    assert!(entry.last_attributes.is_none());

    // aggregate totals
    assert_eq!(analyzer.total_messages(), 5);
    assert_eq!(
        analyzer.message_totals()[&MessageType::RouteMonitoring],
        2
    );
    assert!(analyzer.rd_mismatches().is_empty());
    assert!(analyzer.version_changes().is_empty());
    Ok(())
}

#[test]
fn test_update_attributes_survive_until_withdraw() -> Result<()> {
    let analyzer = run(vec![vec![
        peer_up(PEER_A),
        route_update(PEER_A, "10.0.0.0", "24"),
    ]])?;

    let entry = analyzer
        .ribs()
        .entry(&peer_a(), MonitoringType::AdjInPre, "10.0.0.0/24, id=0, rd=")
        .unwrap();
    assert_eq!(entry.last_state, Some(RouteState::Up));
    let attrs = entry.last_attributes.as_ref().unwrap();
    assert_eq!(attrs.get("origin").map(String::as_str), Some("0"));
    assert_eq!(attrs.get("as_path").map(String::as_str), Some("65000"));
    Ok(())
}

#[test]
fn test_end_of_rib_after_initial_table_transfer() -> Result<()> {
    let analyzer = run(vec![vec![
        peer_up(PEER_A),
        route_update(PEER_A, "10.0.0.0", "24"),
        route_update(PEER_A, "10.0.1.0", "24"),
        end_of_rib(PEER_A),
    ]])?;

    let scope = analyzer
        .ribs()
        .scope(&peer_a(), MonitoringType::AdjInPre)
        .unwrap();
    assert_eq!(scope.len(), 3);

    let eor = scope.get("EoR/0, id=0, rd=").unwrap();
    assert_eq!(eor.update_count, 1);
    assert_eq!(eor.last_state, None);
    assert_eq!(eor.timeline, vec![(3, BgpPduType::EndOfRib)]);
    Ok(())
}

#[test]
fn test_flapping_session_keeps_full_transition_log() -> Result<()> {
    let analyzer = run(vec![vec![
        peer_up(PEER_A),
        peer_down(PEER_A),
        peer_up(PEER_A),
        peer_up(PEER_A), // duplicate
        peer_down(PEER_A),
    ]])?;

    let record = analyzer.sessions().peer(&peer_a()).unwrap();
    assert_eq!(record.counter("PeerUp"), 2);
    assert_eq!(record.counter("PeerDown"), 2);
    assert_eq!(record.counter("PeerUp_duplicate"), 1);
    assert_eq!(record.state_transitions, vec![0, 1, 2, 4]);
    assert_eq!(record.state, Some(MessageType::PeerDown));
    Ok(())
}

#[test]
fn test_two_peers_are_independent() -> Result<()> {
    const PEER_B: &str = "192.0.2.2";
    let analyzer = run(vec![vec![
        peer_up(PEER_A),
        peer_up(PEER_B),
        route_update(PEER_A, "10.0.0.0", "24"),
        peer_down(PEER_B),
    ]])?;

    let a = analyzer.sessions().peer(&peer_a()).unwrap();
    assert_eq!(a.state, Some(MessageType::PeerUp));
    assert_eq!(a.counter("RouteMonitoring"), 1);

    let peer_b = PeerId {
        peer_address: PEER_B.to_string(),
        ..peer_a()
    };
    let b = analyzer.sessions().peer(&peer_b).unwrap();
    assert_eq!(b.state, Some(MessageType::PeerDown));
    assert_eq!(b.counter("RouteMonitoring"), 0);

    assert!(analyzer
        .ribs()
        .scope(&peer_b, MonitoringType::AdjInPre)
        .is_none());
    Ok(())
}

#[test]
fn test_post_policy_monitoring_lands_in_its_own_scope() -> Result<()> {
    let post_policy_update = boxed(
        peer_header(MessageType::RouteMonitoring, PEER_A)
            .with(names::PEER_FLAGS_POST_POLICY, "1")
            .with(names::WITHDRAWN_ROUTES_LENGTH, "0")
            .with(names::PATH_ATTRIBUTES_LENGTH, "30")
            .with(names::PATH_ATTRIBUTE_TYPE_CODE, "1")
            .with(names::NLRI_PREFIX, "10.0.0.0")
            .with(names::NLRI_PREFIX_LENGTH, "24"),
    );
    let analyzer = run(vec![vec![
        peer_up(PEER_A),
        route_update(PEER_A, "10.0.0.0", "24"),
        post_policy_update,
    ]])?;

    let pre = analyzer
        .ribs()
        .scope(&peer_a(), MonitoringType::AdjInPre)
        .unwrap();
    let post = analyzer
        .ribs()
        .scope(&peer_a(), MonitoringType::AdjInPost)
        .unwrap();
    assert_eq!(pre.len(), 1);
    assert_eq!(post.len(), 1);
    Ok(())
}

#[test]
fn test_statistics_report_feeds_stats_tracker() -> Result<()> {
    let stats = |value: &str| {
        boxed(
            peer_header(MessageType::StatisticsReport, PEER_A)
                .with("stat_type", "0")
                .with("stat_len", "4")
                .with("stat_data", value),
        )
    };
    let analyzer = run(vec![vec![peer_up(PEER_A), stats("10"), stats("4")]])?;

    let record = analyzer.stats().stat(&peer_a(), 0).unwrap();
    assert_eq!(record.samples, 2);
    assert_eq!(record.regressions, 1);
    assert_eq!(analyzer.stats().total_regressions(), 1);

    // stats reports also count against the session
    let session = analyzer.sessions().peer(&peer_a()).unwrap();
    assert_eq!(session.counter("StatisticsReport"), 2);
    Ok(())
}
