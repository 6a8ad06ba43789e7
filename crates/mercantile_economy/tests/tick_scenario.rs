//! End-to-end tests: a small mining economy loaded from config and ticked.

use mercantile_core::EntityId;
use mercantile_economy::{Economy, Fill, TickReport};

const MINING_JSON: &str = r#"{
    "component_defs": [
        {"name": "name", "type": "str"},
        {"name": "location", "type": "id"},
        {"name": "produces", "type": "itemRate"},
        {"name": "converts", "type": "conversion"},
        {"name": "sells", "type": "itemPrice"}
    ],
    "entity_defs": [
        {"name": "Item"},
        {"name": "Parcel"},
        {"name": "Mine", "fusedInv": "location"},
        {"name": "Smelter"}
    ],
    "entities": [
        {"type": "Mine", "id": "mine",
         "comps": [["location", "claim"], ["produces", ["ore", 1.0]]],
         "inv": [["ore", 1]]},
        {"type": "Parcel", "id": "claim", "inv": [["ore", 2]]},
        {"type": "Smelter", "id": "smelter",
         "comps": [["converts", [1.0, "smelt"]], ["sells", ["metal", 6]]],
         "inv": [["ore", 10]]},
        {"type": "Item", "id": "ore", "comps": [["name", "Ore"]]},
        {"type": "Item", "id": "metal", "comps": [["name", "Metal"]]}
    ],
    "conversions": [
        {"name": "Smelting", "id": "smelt", "input": [["ore", 2]], "output": [["metal", 1]]}
    ],
    "market": {
        "sinks": [{"name": "Foundry", "item": "metal", "maxBuyPrice": 8, "maxBuysPerTick": 2}]
    }
}"#;

const MINING_TOML: &str = r#"
component_defs = [
    { name = "name", type = "str" },
    { name = "location", type = "id" },
    { name = "produces", type = "itemRate" },
    { name = "converts", type = "conversion" },
    { name = "sells", type = "itemPrice" },
]
entity_defs = [
    { name = "Item" },
    { name = "Parcel" },
    { name = "Mine", fusedInv = "location" },
    { name = "Smelter" },
]

[[entities]]
type = "Mine"
id = "mine"
comps = [["location", "claim"], ["produces", ["ore", 1.0]]]
inv = [["ore", 1]]

[[entities]]
type = "Parcel"
id = "claim"
inv = [["ore", 2]]

[[entities]]
type = "Smelter"
id = "smelter"
comps = [["converts", [1.0, "smelt"]], ["sells", ["metal", 6]]]
inv = [["ore", 10]]

[[entities]]
type = "Item"
id = "ore"
comps = [["name", "Ore"]]

[[entities]]
type = "Item"
id = "metal"
comps = [["name", "Metal"]]

[[conversions]]
name = "Smelting"
id = "smelt"
input = [["ore", 2]]
output = [["metal", 1]]

[[market.sinks]]
name = "Foundry"
item = "metal"
maxBuyPrice = 8
maxBuysPerTick = 2
"#;

const MINE: EntityId = EntityId::new(2);
const CLAIM: EntityId = EntityId::new(3);
const SMELTER: EntityId = EntityId::new(4);
const ORE: EntityId = EntityId::new(5);

#[test]
fn test_load_summary() {
    let mut economy = Economy::new();
    let summary = economy.load_json_str(MINING_JSON).unwrap();

    assert_eq!(summary.component_defs, 5);
    assert_eq!(summary.entity_defs, 4);
    assert_eq!(summary.entities, 5);
    assert_eq!(summary.conversions, 1);
    assert_eq!(summary.sinks, 1);
    assert_eq!(summary.fixups_applied, 10);
    assert_eq!(summary.fixups_skipped, 0);
    assert_eq!(summary.fusions, 1);
}

#[test]
fn test_first_tick() {
    let mut economy = Economy::from_json_str(MINING_JSON).unwrap();
    let report = economy.tick();

    assert_eq!(
        report,
        TickReport {
            tick: 1,
            produced: 1,
            conversion_batches: 1,
            orders_posted: 1,
            units_escrowed: 1,
            units_sold: 1,
            sink_spend: 6,
        }
    );

    let world = economy.world();
    // The mine and its claim share one inventory: 1 + 2 loaded, 1 mined.
    assert_eq!(world.item_count_by_name(MINE, "Ore"), 4);
    assert_eq!(world.item_count_by_name(CLAIM, "Ore"), 4);
    assert_eq!(world.item_count_by_name(SMELTER, "Ore"), 8);
    assert_eq!(world.item_count_by_name(SMELTER, "Metal"), 0);
    assert_eq!(
        world.escrow_count_by_name(SMELTER, economy.sink_entity(), "Metal"),
        1
    );
}

#[test]
fn test_smelter_runs_dry_then_catches_up() {
    let mut economy = Economy::from_json_str(MINING_JSON).unwrap();
    for _ in 0..5 {
        economy.tick();
    }

    let sink = economy.sink_entity();
    let world = economy.world();
    assert_eq!(world.item_count_by_name(SMELTER, "Ore"), 0);
    assert_eq!(world.escrow_count_by_name(SMELTER, sink, "Metal"), 5);

    // Out of ore: the accumulator keeps growing but nothing converts.
    assert_eq!(economy.tick().conversion_batches, 0);
    assert_eq!(economy.tick().conversion_batches, 0);

    economy.world_mut().add_item(SMELTER, ORE, 4).unwrap();
    let report = economy.tick();
    assert_eq!(report.conversion_batches, 2);
    assert_eq!(report.units_sold, 2);
    assert_eq!(report.sink_spend, 12);
    assert_eq!(
        economy.world().escrow_count_by_name(SMELTER, sink, "Metal"),
        7
    );
}

#[test]
fn test_commodity_totals_count_shared_inventory_once() {
    let mut economy = Economy::from_json_str(MINING_JSON).unwrap();
    for _ in 0..5 {
        economy.tick();
    }

    let totals = economy.commodity_totals().unwrap();
    // Shared mine/claim inventory: 3 loaded + 5 mined. Smelter is empty.
    assert_eq!(totals.get(ORE.raw()), 8);
    assert_eq!(totals.get(EntityId::new(6).raw()), 0);
}

#[test]
fn test_toml_and_json_documents_agree() {
    let mut from_json = Economy::from_json_str(MINING_JSON).unwrap();
    let mut from_toml = Economy::from_toml_str(MINING_TOML).unwrap();

    let json_reports: Vec<_> = (0..12).map(|_| from_json.tick()).collect();
    let toml_reports: Vec<_> = (0..12).map(|_| from_toml.tick()).collect();
    assert_eq!(json_reports, toml_reports);

    assert_eq!(
        from_json.commodity_totals().unwrap().buckets(),
        from_toml.commodity_totals().unwrap().buckets()
    );
}

#[test]
fn test_greedy_buy_through_economy() {
    let mut economy = Economy::from_json_str(
        r#"{
        "entity_defs": [{"name": "Item"}, {"name": "Trader"}],
        "entities": [
            {"type": "Item", "id": "x"},
            {"type": "Trader", "id": "early", "inv": [["x", 3]]},
            {"type": "Trader", "id": "late", "inv": [["x", 10]]},
            {"type": "Trader", "id": "buyer"}
        ]
    }"#,
    )
    .unwrap();
    let x = EntityId::new(2);
    let early = EntityId::new(3);
    let late = EntityId::new(4);
    let buyer = EntityId::new(5);

    let (market, world) = economy.market_mut();
    assert_eq!(market.add_sell_order(world, early, x, 3, 5), 3);
    assert_eq!(market.add_sell_order(world, late, x, 10, 3), 10);

    let fill = market.buy_now(world, buyer, x, 10, 20);
    assert_eq!(fill, Fill { quantity: 4, spent: 18 });
    assert_eq!(world.inventory_of(early).unwrap().escrow_count(buyer, x), 3);
    assert_eq!(world.inventory_of(late).unwrap().escrow_count(buyer, x), 1);
}
