//! Default icon set backed by the node types' sprite references

use crate::domain::NodeType;

use super::host::{IconDescriptor, IconElement, IconSet, IconState};

#[derive(Clone, Copy, Debug, Default)]
pub struct SpriteIconSet;

impl IconSet for SpriteIconSet {
    fn icon(
        &self,
        node_type: &NodeType,
        is_custom: bool,
        color: Option<&str>,
        state: IconState,
    ) -> IconDescriptor {
        let mut class_name = String::from("node-icon");
        if is_custom {
            class_name.push_str(" custom");
        }
        if state != IconState::Normal {
            class_name.push(' ');
            class_name.push_str(state.modifier());
        }

        IconDescriptor {
            icon: node_type.icon.clone(),
            class_name,
            color: color.map(str::to_string),
            is_custom,
            state,
        }
    }

    fn icon_element(&self, node_type: &NodeType) -> IconElement {
        IconElement {
            icon: node_type.icon.clone(),
            title: node_type.title.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_class_names() {
        let node_type = NodeType {
            value: "chest".into(),
            title: "Chest".into(),
            filter: None,
            icon: "chest-sprite".into(),
        };
        let plain = SpriteIconSet.icon(&node_type, false, None, IconState::Normal);
        assert_eq!(plain.class_name, "node-icon");
        assert_eq!(plain.icon, "chest-sprite");

        let custom = SpriteIconSet.icon(&node_type, true, Some("#123456"), IconState::Discovered);
        assert_eq!(custom.class_name, "node-icon custom discovered");
        assert_eq!(custom.color.as_deref(), Some("#123456"));
    }
}
