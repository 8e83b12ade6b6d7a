use pktbench_packet::{parse_frame, Ether, Ipv4, Layer, Layers, Payload, Tcp, Udp};
use proptest::prelude::*;
use std::net::Ipv4Addr;

// Small value ranges so that generated fields collide often enough to
// exercise both matching and mismatching pairs.
fn small_u8() -> impl Strategy<Value = Option<u8>> {
    proptest::option::of(0u8..3)
}

fn small_u16() -> impl Strategy<Value = Option<u16>> {
    proptest::option::of(0u16..3)
}

fn small_u32() -> impl Strategy<Value = Option<u32>> {
    proptest::option::of(0u32..3)
}

fn tcp() -> impl Strategy<Value = Tcp> {
    (small_u16(), small_u16(), small_u32(), small_u32(), small_u8()).prop_map(
        |(src_port, dst_port, seq_num, ack_num, flags)| Tcp {
            src_port,
            dst_port,
            seq_num,
            ack_num,
            flags,
            ..Default::default()
        },
    )
}

fn layer() -> impl Strategy<Value = Layer> {
    prop_oneof![
        small_u16().prop_map(|ether_type| Layer::Ether(Ether {
            ether_type,
            ..Default::default()
        })),
        (small_u8(), small_u8()).prop_map(|(ttl, protocol)| Layer::Ipv4(Ipv4 {
            ttl,
            protocol,
            ..Default::default()
        })),
        tcp().prop_map(Layer::Tcp),
        (small_u16(), small_u16()).prop_map(|(src_port, length)| Layer::Udp(Udp {
            src_port,
            length,
            ..Default::default()
        })),
        proptest::option::of(proptest::collection::vec(0u8..2, 0..3))
            .prop_map(|bytes| Layer::Payload(Payload { bytes })),
    ]
}

fn layers() -> impl Strategy<Value = Layers> {
    proptest::collection::vec(proptest::option::weighted(0.8, layer()), 0..4).prop_map(Layers::from)
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 512,
        .. ProptestConfig::default()
    })]

    #[test]
    fn layer_match_is_symmetric(a in layer(), b in layer()) {
        prop_assert_eq!(a.matches(&b), b.matches(&a));
    }

    #[test]
    fn diff_is_empty_iff_match(x in layers(), y in layers()) {
        prop_assert_eq!(x.matches(&y), x.diff(&y).is_empty(), "{} vs {}", x, y);
        prop_assert_eq!(y.matches(&x), y.diff(&x).is_empty(), "{} vs {}", y, x);
    }

    #[test]
    fn merged_header_matches_override(a in tcp(), b in tcp()) {
        let mut merged = a.clone();
        merged.merge_from(&b);
        prop_assert!(b.matches(&merged));
        prop_assert!(merged.matches(&b));
    }

    #[test]
    fn merge_with_self_is_identity(x in layers()) {
        let mut merged = x.clone();
        merged.merge(&x).unwrap();
        prop_assert_eq!(merged, x);
    }

    #[test]
    fn parse_never_panics(bytes in proptest::collection::vec(any::<u8>(), 0..128)) {
        let res = std::panic::catch_unwind(|| parse_frame(&bytes));
        prop_assert!(res.is_ok());
    }

    #[test]
    fn udp_frames_round_trip(
        src_port in any::<u16>(),
        dst_port in any::<u16>(),
        ttl in proptest::option::of(any::<u8>()),
        data in proptest::collection::vec(any::<u8>(), 0..64),
    ) {
        let frame = Layers::new()
            .with(Ether::default())
            .with(Ipv4 {
                ttl,
                src_addr: Some(Ipv4Addr::new(10, 0, 0, 1)),
                dst_addr: Some(Ipv4Addr::new(10, 0, 0, 2)),
                ..Default::default()
            })
            .with(Udp {
                src_port: Some(src_port),
                dst_port: Some(dst_port),
                ..Default::default()
            })
            .with(Payload::new(data));

        let bytes = frame.to_bytes().unwrap();
        let parsed = parse_frame(&bytes).unwrap();
        prop_assert!(frame.matches(&parsed), "{}", frame.diff(&parsed));
        prop_assert_eq!(parsed.to_bytes().unwrap(), bytes);
    }
}
