use ipfwd_router::{RouteEntry, RoutingTable};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::net::Ipv4Addr;

fn mask_of(prefix_len: u32) -> Ipv4Addr {
    match prefix_len {
        0 => Ipv4Addr::from(0u32),
        len => Ipv4Addr::from(u32::max_value() << (32 - len)),
    }
}

fn random_table(rng: &mut StdRng, size: usize) -> RoutingTable {
    let entries = (0..size)
        .map(|idx| {
            // Few distinct networks, so that plenty of prefixes overlap
            let network =
                Ipv4Addr::from(rng.gen_range(0, 4u32) << 24 | rng.gen_range(0, 4u32) << 16);
            RouteEntry::new(
                network,
                Ipv4Addr::new(0, 0, 0, 0),
                mask_of(rng.gen_range(0, 25)),
                format!("if{}", idx),
            )
        })
        .collect();
    RoutingTable::new(entries)
}

#[test]
fn selected_route_is_longest_and_first() {
    let mut rng = StdRng::seed_from_u64(0x1f2e3d4c);
    for _ in 0..200 {
        let size = rng.gen_range(0, 12);
        let table = random_table(&mut rng, size);
        let dest = Ipv4Addr::from(rng.gen_range(0, 4u32) << 24 | rng.gen::<u32>() & 0x03ff_ffff);

        let matching: Vec<(usize, &RouteEntry)> = table
            .iter()
            .enumerate()
            .filter(|(_, entry)| entry.matches(dest))
            .collect();

        match table.longest_prefix_match(dest) {
            None => assert!(matching.is_empty(), "missed a match for {}", dest),
            Some(selected) => {
                assert!(selected.matches(dest));
                let longest = matching
                    .iter()
                    .map(|(_, entry)| entry.prefix_len())
                    .max()
                    .unwrap();
                assert_eq!(selected.prefix_len(), longest);

                let first = matching
                    .iter()
                    .find(|(_, entry)| entry.prefix_len() == longest)
                    .unwrap();
                assert_eq!(first.1.interface, selected.interface);
            }
        }
    }
}

#[test]
fn slash_24_beats_slash_16() {
    let table = RoutingTable::new(vec![
        RouteEntry::new(
            Ipv4Addr::new(10, 0, 0, 0),
            Ipv4Addr::new(0, 0, 0, 0),
            mask_of(16),
            "B",
        ),
        RouteEntry::new(
            Ipv4Addr::new(10, 0, 0, 0),
            Ipv4Addr::new(0, 0, 0, 0),
            mask_of(24),
            "A",
        ),
    ]);
    let selected = table
        .longest_prefix_match(Ipv4Addr::new(10, 0, 0, 5))
        .unwrap();
    assert_eq!(selected.interface, "A");
}
