use serde::{Deserialize, Serialize};

use crate::models::PackingItem;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryGroup {
    pub category: String,
    pub items: Vec<PackingItem>,
}

/// Groups unpacked items by category, largest group first. Ties keep the order
/// in which categories first appear in the packing list.
pub fn group_unpacked_by_category<'a, I>(items: I) -> Vec<CategoryGroup>
where
    I: IntoIterator<Item = &'a PackingItem>,
{
    let mut groups: Vec<CategoryGroup> = Vec::new();

    for item in items.into_iter().filter(|item| !item.packed) {
        match groups
            .iter_mut()
            .find(|group| group.category == item.category)
        {
            Some(group) => group.items.push(item.clone()),
            None => groups.push(CategoryGroup {
                category: item.category.clone(),
                items: vec![item.clone()],
            }),
        }
    }

    // sort_by is stable.
    groups.sort_by(|a, b| b.items.len().cmp(&a.items.len()));
    groups
}
