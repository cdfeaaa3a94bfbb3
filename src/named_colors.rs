/// Reference colors used to name cluster centroids. Order matters: on equal
/// distance the earlier entry wins.
pub const NAMED_COLORS: &[([u8; 3], &str)] = &[
    // Black, white, gray
    ([0, 0, 0], "Black"),
    ([255, 255, 255], "White"),
    ([128, 128, 128], "Gray"),
    ([169, 169, 169], "Dark Gray"),
    ([211, 211, 211], "Light Gray"),
    // Reds
    ([255, 0, 0], "Red"),
    ([178, 34, 34], "Dark Red"),
    ([220, 20, 60], "Crimson"),
    ([255, 99, 71], "Tomato"),
    ([255, 127, 80], "Coral"),
    // Pinks
    ([255, 192, 203], "Pink"),
    ([255, 105, 180], "Hot Pink"),
    ([219, 112, 147], "Pale Violet Red"),
    // Oranges
    ([255, 165, 0], "Orange"),
    ([255, 140, 0], "Dark Orange"),
    ([255, 69, 0], "Red-Orange"),
    // Yellows
    ([255, 255, 0], "Yellow"),
    ([255, 215, 0], "Gold"),
    ([240, 230, 140], "Khaki"),
    // Greens
    ([0, 128, 0], "Green"),
    ([34, 139, 34], "Forest Green"),
    ([0, 255, 0], "Lime"),
    ([50, 205, 50], "Lime Green"),
    ([152, 251, 152], "Pale Green"),
    ([0, 255, 127], "Spring Green"),
    ([46, 139, 87], "Sea Green"),
    ([60, 179, 113], "Medium Sea Green"),
    ([32, 178, 170], "Light Sea Green"),
    ([0, 128, 128], "Teal"),
    // Blues
    ([0, 0, 255], "Blue"),
    ([0, 0, 139], "Dark Blue"),
    ([0, 0, 205], "Medium Blue"),
    ([65, 105, 225], "Royal Blue"),
    ([100, 149, 237], "Cornflower Blue"),
    ([135, 206, 235], "Sky Blue"),
    ([173, 216, 230], "Light Blue"),
    ([176, 224, 230], "Powder Blue"),
    ([95, 158, 160], "Cadet Blue"),
    ([70, 130, 180], "Steel Blue"),
    ([30, 144, 255], "Dodger Blue"),
    ([0, 191, 255], "Deep Sky Blue"),
    // Purples
    ([128, 0, 128], "Purple"),
    ([148, 0, 211], "Dark Violet"),
    ([153, 50, 204], "Dark Orchid"),
    ([138, 43, 226], "Blue Violet"),
    ([147, 112, 219], "Medium Purple"),
    ([186, 85, 211], "Medium Orchid"),
    ([218, 112, 214], "Orchid"),
    ([221, 160, 221], "Plum"),
    ([238, 130, 238], "Violet"),
    ([255, 0, 255], "Magenta"),
    ([255, 20, 147], "Deep Pink"),
    // Browns and off-whites
    ([165, 42, 42], "Brown"),
    ([139, 69, 19], "Saddle Brown"),
    ([160, 82, 45], "Sienna"),
    ([210, 105, 30], "Chocolate"),
    ([205, 133, 63], "Peru"),
    ([222, 184, 135], "Burlywood"),
    ([245, 245, 220], "Beige"),
    ([250, 235, 215], "Antique White"),
    ([255, 228, 196], "Bisque"),
    ([255, 222, 173], "Navajo White"),
    ([245, 222, 179], "Wheat"),
    ([210, 180, 140], "Tan"),
];

/// Name of the reference color nearest to `rgb` in Euclidean RGB distance.
///
/// Squared distances are compared, which orders candidates the same way as
/// the true distance and keeps the scan in integers.
pub fn find_closest_color(rgb: [u8; 3]) -> &'static str {
    let [r, g, b] = rgb.map(i32::from);
    let mut best_name = "Unknown";
    let mut best_dist = i32::MAX;
    for &(reference, name) in NAMED_COLORS {
        let dr = r - reference[0] as i32;
        let dg = g - reference[1] as i32;
        let db = b - reference[2] as i32;
        let dist = dr * dr + dg * dg + db * db;
        if dist < best_dist {
            best_dist = dist;
            best_name = name;
        }
    }
    best_name
}
