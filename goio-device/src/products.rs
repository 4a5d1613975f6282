use crate::Error;

// Vernier's USB vendor ID, shared by every GoIO interface
pub const VERNIER_VENDOR_ID: u16 = 0x08F7;

/// The GoIO interfaces this crate knows how to find.
///
/// The SDK headers name them after their internal codenames: Go! Link is "Skip",
/// Go! Temp is "Jonah" (USB direct temp) and Go! Motion is "Cyclops".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Product {
    GoTemp,
    GoLink,
    GoMotion,
    MiniGc,
}

impl Product {
    /// Order in which attached devices are looked for; the first one found wins.
    pub const DISCOVERY_ORDER: [Product; 4] = [
        Product::GoLink,
        Product::GoTemp,
        Product::GoMotion,
        Product::MiniGc,
    ];

    pub const fn id(self) -> u16 {
        match self {
            Product::GoTemp => 0x0002,
            Product::GoLink => 0x0003,
            Product::GoMotion => 0x0004,
            Product::MiniGc => 0x0007,
        }
    }

    pub fn from_id(id: u16) -> Result<Self, Error> {
        Self::DISCOVERY_ORDER
            .into_iter()
            .find(|p| p.id() == id)
            .ok_or(Error::UnknownProduct(id))
    }

    pub fn description(self) -> &'static str {
        device_description(i32::from(self.id()))
    }
}

const DEVICE_DESCRIPTIONS: [&str; 8] = [
    "?",
    "?",
    "Go! Temp",
    "Go! Link",
    "Go! Motion",
    "?",
    "?",
    "Mini GC",
];

/// Human-readable name for a product ID, "?" for anything unknown.
pub fn device_description(product_id: i32) -> &'static str {
    usize::try_from(product_id)
        .ok()
        .and_then(|idx| DEVICE_DESCRIPTIONS.get(idx))
        .copied()
        .unwrap_or("?")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn descriptions_match_product_ids() {
        assert_eq!(Product::GoTemp.description(), "Go! Temp");
        assert_eq!(Product::GoLink.description(), "Go! Link");
        assert_eq!(Product::GoMotion.description(), "Go! Motion");
        assert_eq!(Product::MiniGc.description(), "Mini GC");
    }

    #[test]
    fn unknown_ids_are_described_as_question_marks() {
        assert_eq!(device_description(0), "?");
        assert_eq!(device_description(5), "?");
        assert_eq!(device_description(8), "?");
        assert_eq!(device_description(-1), "?");
    }

    #[test]
    fn discovery_prefers_go_link_and_ends_with_mini_gc() {
        let ids = Product::DISCOVERY_ORDER.map(Product::id);
        assert_eq!(ids, [0x0003, 0x0002, 0x0004, 0x0007]);
    }

    #[test]
    fn from_id_rejects_unsupported_products() {
        assert_eq!(Product::from_id(0x0004).unwrap(), Product::GoMotion);
        assert!(matches!(
            Product::from_id(0x0005),
            Err(Error::UnknownProduct(0x0005))
        ));
    }
}
