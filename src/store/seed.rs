//! Fixed seed dataset: a handful of well-known roasters and beans plus two
//! demo users. Used when neither the backend nor a snapshot has any data.

use std::collections::BTreeMap;

use crate::models::{AppUser, Bean, Coordinates, FlavorIntensity, Roaster};

use super::StoreState;

const SEEDED_AT: &str = "2026-01-01T00:00:00.000Z";

struct SeedRoaster {
    id: &'static str,
    name: &'static str,
    slug: &'static str,
    location: &'static str,
    coordinates: (f64, f64),
    description: &'static str,
    specialties: &'static [&'static str],
}

struct SeedBean {
    id: &'static str,
    roaster_id: &'static str,
    name: &'static str,
    origin: &'static str,
    process: &'static str,
    roast_level: &'static str,
    tasting_notes: &'static [&'static str],
    flavor_profile: &'static [(&'static str, u8)],
    price: f64,
}

const ROASTERS: &[SeedRoaster] = &[
    SeedRoaster {
        id: "1",
        name: "Stumptown",
        slug: "stumptown",
        location: "Portland, OR",
        coordinates: (45.5231, -122.6765),
        description: "Direct-trade pioneer roasting in Portland since 1999.",
        specialties: &["espresso", "single origin"],
    },
    SeedRoaster {
        id: "2",
        name: "Blue Bottle",
        slug: "blue-bottle",
        location: "Oakland, CA",
        coordinates: (37.8044, -122.2712),
        description: "Small-batch roaster focused on freshness.",
        specialties: &["pour over", "blends"],
    },
    SeedRoaster {
        id: "3",
        name: "Counter Culture",
        slug: "counter-culture",
        location: "Durham, NC",
        coordinates: (35.994, -78.8986),
        description: "Sustainability-minded roaster with a training network.",
        specialties: &["light roast", "seasonal"],
    },
];

const BEANS: &[SeedBean] = &[
    SeedBean {
        id: "1",
        roaster_id: "1",
        name: "Hair Bender",
        origin: "Blend (Latin America, Africa, Indonesia)",
        process: "washed",
        roast_level: "medium",
        tasting_notes: &["dark chocolate", "cherry", "toffee"],
        flavor_profile: &[("chocolate", 4), ("fruit", 3), ("sweetness", 3)],
        price: 17.0,
    },
    SeedBean {
        id: "2",
        roaster_id: "1",
        name: "Holler Mountain",
        origin: "Blend (Colombia, Ethiopia)",
        process: "washed",
        roast_level: "medium",
        tasting_notes: &["caramel", "citrus"],
        flavor_profile: &[("caramel", 4), ("citrus", 2)],
        price: 16.0,
    },
    SeedBean {
        id: "3",
        roaster_id: "2",
        name: "Bella Donovan",
        origin: "Blend (Ethiopia, Sumatra)",
        process: "natural",
        roast_level: "medium-dark",
        tasting_notes: &["raspberry", "chocolate"],
        flavor_profile: &[("berry", 3), ("chocolate", 4)],
        price: 19.5,
    },
    SeedBean {
        id: "4",
        roaster_id: "2",
        name: "Giant Steps",
        origin: "Blend (Uganda, Papua New Guinea)",
        process: "washed",
        roast_level: "dark",
        tasting_notes: &["cocoa", "graham cracker"],
        flavor_profile: &[("cocoa", 5), ("body", 4)],
        price: 19.5,
    },
    SeedBean {
        id: "5",
        roaster_id: "3",
        name: "Hologram",
        origin: "Blend (Ethiopia, Colombia)",
        process: "natural",
        roast_level: "light",
        tasting_notes: &["berry", "milk chocolate", "juicy"],
        flavor_profile: &[("berry", 4), ("acidity", 3)],
        price: 18.25,
    },
];

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| (*v).to_string()).collect()
}

/// Build the seed state.
pub fn seed_state() -> StoreState {
    let roasters: BTreeMap<String, Roaster> = ROASTERS
        .iter()
        .map(|r| {
            let roaster = Roaster {
                id: r.id.to_string(),
                slug: r.slug.to_string(),
                name: r.name.to_string(),
                location: r.location.to_string(),
                coordinates: Some(Coordinates {
                    lat: r.coordinates.0,
                    lng: r.coordinates.1,
                }),
                description: r.description.to_string(),
                specialties: strings(r.specialties),
                created_by: None,
                created_at: SEEDED_AT.to_string(),
            };
            (roaster.id.clone(), roaster)
        })
        .collect();

    let beans: BTreeMap<String, Bean> = BEANS
        .iter()
        .map(|b| {
            let bean = Bean {
                id: b.id.to_string(),
                roaster_id: b.roaster_id.to_string(),
                name: b.name.to_string(),
                origin: b.origin.to_string(),
                process: b.process.to_string(),
                roast_level: b.roast_level.to_string(),
                tasting_notes: strings(b.tasting_notes),
                flavor_profile: b
                    .flavor_profile
                    .iter()
                    .map(|(name, intensity)| FlavorIntensity {
                        name: (*name).to_string(),
                        intensity: *intensity,
                    })
                    .collect(),
                price: Some(b.price),
                rating: None,
                review_count: 0,
                created_by: None,
                created_at: SEEDED_AT.to_string(),
            };
            (bean.id.clone(), bean)
        })
        .collect();

    let mut lover = AppUser::new("u1", "coffee_lover", "Coffee Lover", SEEDED_AT);
    lover.favorite_styles = strings(&["pour over", "light roast"]);
    let mut hunter = AppUser::new("u2", "bean_hunter", "Bean Hunter", SEEDED_AT);
    hunter.favorite_styles = strings(&["espresso"]);

    let users = [lover, hunter]
        .into_iter()
        .map(|u| (u.id.clone(), u))
        .collect();

    StoreState {
        users,
        roasters,
        beans,
        ..StoreState::default()
    }
}
