//! Property-based tests for inventories, escrow and commodity sets.
//!
//! Run with: cargo test --package mercantile_core --test ledger_properties

use mercantile_core::{CommoditySet, EntityId, Inventory, InternalType, World};
use proptest::prelude::*;

const ITEMS: [EntityId; 4] = [
    EntityId::new(10),
    EntityId::new(11),
    EntityId::new(12),
    EntityId::new(13),
];
const OWNERS: [EntityId; 3] = [EntityId::new(20), EntityId::new(21), EntityId::new(22)];

/// One step against an inventory's escrow ledger.
#[derive(Clone, Debug)]
enum EscrowOp {
    Move { item: usize, count: i64 },
    ChangeOwner { from: usize, to: usize, item: usize, count: i64 },
}

fn escrow_op() -> impl Strategy<Value = EscrowOp> {
    prop_oneof![
        (0..ITEMS.len(), -5_i64..=30).prop_map(|(item, count)| EscrowOp::Move { item, count }),
        (0..OWNERS.len(), 0..OWNERS.len(), 0..ITEMS.len(), -5_i64..=30).prop_map(
            |(from, to, item, count)| EscrowOp::ChangeOwner { from, to, item, count }
        ),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(512))]

    #[test]
    fn test_counts_never_negative(
        adds in prop::collection::vec((0..ITEMS.len(), -50_i64..=40), 0..200)
    ) {
        let mut inv = Inventory::new();
        for (item, count) in adds {
            inv.add_item(ITEMS[item], count);
            prop_assert!(inv.items().all(|i| i.count >= 0));
        }
    }

    #[test]
    fn test_escrow_never_exceeds_original_stock(
        original in prop::array::uniform4(0_i64..=100),
        ops in prop::collection::vec(escrow_op(), 0..200)
    ) {
        let mut inv = Inventory::new();
        for (&item, &stock) in ITEMS.iter().zip(&original) {
            inv.add_item(item, stock);
        }

        for op in ops {
            match op {
                EscrowOp::Move { item, count } => {
                    inv.move_to_escrow(OWNERS[0], ITEMS[item], count);
                }
                EscrowOp::ChangeOwner { from, to, item, count } => {
                    inv.escrow_change_owner(OWNERS[from], OWNERS[to], ITEMS[item], count);
                }
            }

            for (&item, &stock) in ITEMS.iter().zip(&original) {
                let escrowed = inv.total_escrowed(item);
                prop_assert!(escrowed <= stock);
                prop_assert_eq!(escrowed + inv.count(item), stock);
            }
        }
    }

    #[test]
    fn test_commodity_set_stays_sorted(
        adds in prop::collection::vec((0_u32..64, -10_i64..=10), 0..300)
    ) {
        let mut set = CommoditySet::with_capacity(64);
        let mut expected = [0_i64; 64];

        for (id, qty) in adds {
            set.add(id, qty, false).unwrap();
            expected[id as usize] += qty;

            let ids: Vec<_> = set.buckets().iter().map(|b| b.commodity).collect();
            prop_assert!(ids.windows(2).all(|w| w[0] < w[1]));
        }

        for (id, &qty) in (0_u32..).zip(expected.iter()) {
            prop_assert_eq!(set.get(id), qty);
        }
    }
}

#[test]
fn test_renderer_queries_on_a_populated_world() {
    let mut world = World::new();
    let name = world.register_component_type("name", InternalType::Str, false).unwrap();
    let item = world.register_entity_def("Item", None).unwrap();
    let shop = world.register_entity_def("Shop", None).unwrap();

    let bread = world.create_entity(item, "bread").unwrap();
    world.set_component(bread, name, "Bread".into()).unwrap();
    let bakery = world.create_entity(shop, "bakery").unwrap();
    let customer = world.create_entity(shop, "customer").unwrap();

    world.add_item(bakery, bread, 12).unwrap();
    let inv = world.inventory_of_mut(bakery).unwrap();
    inv.move_to_escrow(bakery, bread, 5);
    inv.escrow_change_owner(bakery, customer, bread, 2);

    assert_eq!(world.item_count_by_name(bakery, "Bread"), 7);
    assert_eq!(world.escrow_count_by_name(bakery, bakery, "Bread"), 3);
    assert_eq!(world.escrow_count_by_name(bakery, customer, "Bread"), 2);
    assert_eq!(world.entities_of_type(shop).count(), 2);
    assert_eq!(
        world.component_by_name(bread, "name").and_then(|c| c.as_str()),
        Some("Bread")
    );
}
