use crate::product::Product;

/// Cosmetic rewrite applied to each product just before it is written.
pub trait Transform: Send + Sync {
    fn apply(&self, product: Product) -> Product;

    fn apply_all(&self, products: Vec<Product>) -> Vec<Product> {
        products.into_iter().map(|p| self.apply(p)).collect()
    }
}

/// Alternating-case product names: "Apple Cider" -> "aPpLe CiDeR".
/// Only letters advance the alternation, so the result is stable for a
/// given name. URL and metadata are left alone.
pub struct Sillify;

impl Transform for Sillify {
    fn apply(&self, product: Product) -> Product {
        Product {
            name: sillify(&product.name),
            ..product
        }
    }
}

pub fn sillify(text: &str) -> String {
    let mut upper = false;
    text.chars()
        .flat_map(|c| {
            let out: Vec<char> = if !c.is_alphabetic() {
                vec![c]
            } else if upper {
                c.to_uppercase().collect()
            } else {
                c.to_lowercase().collect()
            };
            if c.is_alphabetic() {
                upper = !upper;
            }
            out
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::product::Metadata;

    #[test]
    fn test_sillify_alternates_letters_only() {
        assert_eq!(sillify("Apple Cider"), "aPpLe CiDeR");
        assert_eq!(sillify("4 x 473mL"), "4 x 473Ml");
        assert_eq!(sillify(""), "");
    }

    #[test]
    fn test_sillify_is_deterministic() {
        assert_eq!(sillify("Big Orchard"), sillify("Big Orchard"));
    }

    #[test]
    fn test_transform_touches_only_name() {
        let metadata = Metadata { price: Some("9.99".into()), ..Default::default() };
        let p = Product::new("Dry Cider", "https://x/Dry").with_metadata(metadata.clone());
        let out = Sillify.apply(p);
        assert_eq!(out.name, "dRy CiDeR");
        assert_eq!(out.url, "https://x/Dry");
        assert_eq!(out.metadata, metadata);
    }

    #[test]
    fn test_apply_all_keeps_order() {
        let products = vec![Product::new("ab", "1"), Product::new("cd", "2")];
        let out = Sillify.apply_all(products);
        assert_eq!(out[0].name, "aB");
        assert_eq!(out[1].url, "2");
    }
}
