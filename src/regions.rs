// Map-marker coordinates of the 17 top-level administrative regions.
use once_cell::sync::Lazy;
use std::collections::HashMap;

static REGION_COORDS: Lazy<HashMap<&'static str, (f64, f64)>> = Lazy::new(|| {
    HashMap::from([
        ("서울특별시", (37.5665, 126.9780)),
        ("부산광역시", (35.1796, 129.0756)),
        ("대구광역시", (35.8714, 128.6014)),
        ("인천광역시", (37.4563, 126.7052)),
        ("광주광역시", (35.1595, 126.8526)),
        ("대전광역시", (36.3504, 127.3845)),
        ("울산광역시", (35.5384, 129.3114)),
        ("세종특별자치시", (36.4801, 127.2890)),
        ("경기도", (37.2636, 127.0286)),
        ("강원특별자치도", (37.8228, 128.1555)),
        ("충청북도", (36.6357, 127.4917)),
        ("충청남도", (36.5184, 126.8000)),
        ("전북특별자치도", (35.8200, 127.1088)),
        ("전라남도", (34.8161, 126.4635)),
        ("경상북도", (36.4919, 128.8889)),
        ("경상남도", (35.4606, 128.2132)),
        ("제주특별자치도", (33.4996, 126.5312)),
    ])
});

/// Default map centre for a whole-country view.
pub const COUNTRY_CENTER: (f64, f64) = (36.5, 127.8);

/// `(latitude, longitude)` of a region, if it is one of the known regions.
pub fn coordinates(region: &str) -> Option<(f64, f64)> {
    REGION_COORDS.get(region.trim()).copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_and_unknown_regions() {
        assert_eq!(coordinates("서울특별시"), Some((37.5665, 126.9780)));
        assert_eq!(coordinates(" 제주특별자치도 "), Some((33.4996, 126.5312)));
        assert_eq!(coordinates("총계"), None);
    }
}
