//! Cache key construction.
//!
//! Keys are `namespace:rover[:discriminator]`. The rover field can never
//! contain the delimiter (see [`RoverId`]) and the discriminator is always the
//! last field, so splitting on the first two delimiters recovers every field
//! and two distinct requests can never share a key.

use std::fmt;

use crate::domain::{EarthDate, RoverId, Sol};

pub const KEY_DELIMITER: char = ':';

/// One of the supported query shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceClass {
    Manifest,
    Sol,
    EarthDate,
}

impl ResourceClass {
    pub fn namespace(self) -> &'static str {
        match self {
            ResourceClass::Manifest => "manifest",
            ResourceClass::Sol => "sol",
            ResourceClass::EarthDate => "earthdate",
        }
    }
}

impl fmt::Display for ResourceClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.namespace())
    }
}

/// Resource-specific parameter distinguishing requests within a class.
///
/// The variant determines the class, so a key can never pair a class with the
/// wrong discriminator type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Discriminator {
    Manifest,
    Sol(Sol),
    EarthDate(EarthDate),
}

impl Discriminator {
    pub fn class(&self) -> ResourceClass {
        match self {
            Discriminator::Manifest => ResourceClass::Manifest,
            Discriminator::Sol(_) => ResourceClass::Sol,
            Discriminator::EarthDate(_) => ResourceClass::EarthDate,
        }
    }
}

/// A fully-formed cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    class: ResourceClass,
    value: String,
}

impl CacheKey {
    pub fn build(rover: &RoverId, discriminator: &Discriminator) -> Self {
        let class = discriminator.class();
        let value = match discriminator {
            Discriminator::Manifest => {
                format!("{}{KEY_DELIMITER}{rover}", class.namespace())
            }
            Discriminator::Sol(sol) => {
                format!(
                    "{}{KEY_DELIMITER}{rover}{KEY_DELIMITER}{sol}",
                    class.namespace()
                )
            }
            Discriminator::EarthDate(date) => {
                format!(
                    "{}{KEY_DELIMITER}{rover}{KEY_DELIMITER}{date}",
                    class.namespace()
                )
            }
        };
        Self { class, value }
    }

    pub fn manifest(rover: &RoverId) -> Self {
        Self::build(rover, &Discriminator::Manifest)
    }

    pub fn sol(rover: &RoverId, sol: Sol) -> Self {
        Self::build(rover, &Discriminator::Sol(sol))
    }

    pub fn earth_date(rover: &RoverId, date: &EarthDate) -> Self {
        Self::build(rover, &Discriminator::EarthDate(date.clone()))
    }

    pub fn class(&self) -> ResourceClass {
        self.class
    }

    pub fn as_str(&self) -> &str {
        &self.value
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    fn rover(name: &str) -> RoverId {
        RoverId::parse(name).expect("valid rover")
    }

    fn date(raw: &str) -> EarthDate {
        EarthDate::parse(raw).expect("valid date")
    }

    #[test]
    fn keys_use_fixed_field_order() {
        let curiosity = rover("curiosity");
        assert_eq!(CacheKey::manifest(&curiosity).as_str(), "manifest:curiosity");
        assert_eq!(
            CacheKey::sol(&curiosity, Sol::new(1000)).as_str(),
            "sol:curiosity:1000"
        );
        assert_eq!(
            CacheKey::earth_date(&curiosity, &date("2015-6-3")).as_str(),
            "earthdate:curiosity:2015-6-3"
        );
    }

    #[test]
    fn identical_requests_share_a_key() {
        let first = CacheKey::sol(&rover("Spirit"), Sol::new(7));
        let second = CacheKey::sol(&rover("spirit"), Sol::new(7));
        assert_eq!(first, second);
        assert_eq!(first.class(), ResourceClass::Sol);
    }

    #[test]
    fn distinct_requests_never_collide() {
        let rovers = ["curiosity", "spirit", "opportunity", "a", "a-b", "a_b"];
        let dates = ["2015-6-3", "1000", "b:c", "x:1", ""];

        let mut seen = HashSet::new();
        let mut total = 0;
        for name in rovers {
            let id = rover(name);
            assert!(seen.insert(CacheKey::manifest(&id)));
            total += 1;
            for sol in [0, 1, 10, 1000] {
                assert!(seen.insert(CacheKey::sol(&id, Sol::new(sol))));
                total += 1;
            }
            for raw in dates.iter().filter(|d| !d.is_empty()) {
                assert!(seen.insert(CacheKey::earth_date(&id, &date(raw))));
                total += 1;
            }
        }

        let rendered: HashSet<&str> = seen.iter().map(CacheKey::as_str).collect();
        assert_eq!(rendered.len(), total);
    }

    #[test]
    fn numeric_date_does_not_alias_sol() {
        let id = rover("curiosity");
        let by_sol = CacheKey::sol(&id, Sol::new(1000));
        let by_date = CacheKey::earth_date(&id, &date("1000"));
        assert_ne!(by_sol.as_str(), by_date.as_str());
    }
}
