use inflector::Inflector;

/// Derive the forward relationship name from a foreign-key column.
///
/// Strips a trailing `_id`/`Id` suffix and snake_cases the remainder;
/// when stripping leaves nothing (the column is literally `id`), falls back
/// to the singularized referenced table name.
pub fn relation_name_from_column(fk_column: &str, referenced_table: &str) -> String {
    let base = strip_id_suffix(fk_column);
    if base.is_empty() {
        referenced_table.to_snake_case().to_singular()
    } else {
        base.to_snake_case()
    }
}

/// Derive the reverse relationship name: the pluralized snake_case form of
/// the owning table's name.
pub fn inverse_relation_name(from_table: &str) -> String {
    from_table.to_snake_case().to_plural()
}

fn strip_id_suffix(name: &str) -> &str {
    if let Some(stripped) = name.strip_suffix("_id") {
        stripped
    } else if let Some(stripped) = name.strip_suffix("Id") {
        stripped
    } else {
        name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snake_suffix_is_stripped() {
        assert_eq!(relation_name_from_column("user_id", "users"), "user");
        assert_eq!(
            relation_name_from_column("author_profile_id", "profiles"),
            "author_profile"
        );
    }

    #[test]
    fn camel_suffix_is_stripped() {
        assert_eq!(relation_name_from_column("ownerId", "users"), "owner");
    }

    #[test]
    fn bare_id_falls_back_to_referenced_table() {
        assert_eq!(relation_name_from_column("id", "users"), "user");
        assert_eq!(relation_name_from_column("_id", "categories"), "category");
    }

    #[test]
    fn unsuffixed_column_is_used_as_is() {
        assert_eq!(relation_name_from_column("parent", "nodes"), "parent");
    }

    #[test]
    fn inverse_name_pluralizes_owner() {
        assert_eq!(inverse_relation_name("post"), "posts");
        assert_eq!(inverse_relation_name("posts"), "posts");
        assert_eq!(inverse_relation_name("category"), "categories");
        assert_eq!(inverse_relation_name("OrderItem"), "order_items");
    }
}
