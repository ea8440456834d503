use serde::Serialize;

/// Fixed style palette the platform renders. `Primary` doubles as the
/// "selected" marker once a group is locked.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ButtonStyle {
    Primary,
    Secondary,
    Success,
    Danger,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Button {
    pub id: String,
    pub label: String,
    pub style: ButtonStyle,
    pub disabled: bool,
}

impl Button {
    pub fn new(id: impl Into<String>, label: impl Into<String>, style: ButtonStyle) -> Self {
        Self { id: id.into(), label: label.into(), style, disabled: false }
    }

    pub fn disabled(mut self, disabled: bool) -> Self {
        self.disabled = disabled;
        self
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ButtonRow {
    pub buttons: Vec<Button>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ButtonGroup {
    pub rows: Vec<ButtonRow>,
}

impl ButtonGroup {
    pub fn buttons(&self) -> impl Iterator<Item = &Button> {
        self.rows.iter().flat_map(|row| row.buttons.iter())
    }

    pub fn find(&self, id_fragment: &str) -> Option<&Button> {
        self.buttons().find(|button| button.id.contains(id_fragment))
    }
}

pub const MAX_BUTTONS_PER_ROW: usize = 5;

/// The confirm/cancel pair shown when a slot is agreed. Ids are fixed;
/// the router matches clicks on them by prefix.
pub fn confirmation_group(confirm_disabled: bool, cancel_disabled: bool) -> ButtonGroup {
    ButtonGroup {
        rows: vec![ButtonRow {
            buttons: vec![
                Button::new("confirm", "Confirm", ButtonStyle::Success)
                    .disabled(confirm_disabled),
                Button::new("cancel", "Cancel", ButtonStyle::Danger).disabled(cancel_disabled),
            ],
        }],
    }
}

/// One neutral button per option, id `time_<option>`, packed into rows of
/// at most five in the given order.
pub fn time_selection_group<I, S>(options: I) -> ButtonGroup
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut rows = Vec::new();
    let mut row = ButtonRow::default();

    for option in options {
        if row.buttons.len() == MAX_BUTTONS_PER_ROW {
            rows.push(std::mem::take(&mut row));
        }
        let option = option.as_ref();
        row.buttons.push(Button::new(format!("time_{option}"), option, ButtonStyle::Secondary));
    }

    rows.push(row);
    ButtonGroup { rows }
}

/// A locked copy of `group`: every button disabled, and the button whose
/// id contains `selected_id_fragment` promoted to the primary style so it
/// reads as the selection. Other buttons keep their original style. The
/// input group is not touched.
pub fn with_selection(group: &ButtonGroup, selected_id_fragment: &str) -> ButtonGroup {
    ButtonGroup {
        rows: group
            .rows
            .iter()
            .map(|row| ButtonRow {
                buttons: row
                    .buttons
                    .iter()
                    .map(|button| {
                        let style = if button.id.contains(selected_id_fragment) {
                            ButtonStyle::Primary
                        } else {
                            button.style
                        };
                        Button { style, disabled: true, ..button.clone() }
                    })
                    .collect(),
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::{
        confirmation_group, time_selection_group, with_selection, ButtonStyle,
        MAX_BUTTONS_PER_ROW,
    };

    #[test]
    fn confirmation_group_has_fixed_ids_and_styles() {
        let group = confirmation_group(false, true);
        let buttons: Vec<_> = group.buttons().collect();

        assert_eq!(buttons.len(), 2);
        assert_eq!(buttons[0].id, "confirm");
        assert_eq!(buttons[0].style, ButtonStyle::Success);
        assert!(!buttons[0].disabled);
        assert_eq!(buttons[1].id, "cancel");
        assert_eq!(buttons[1].style, ButtonStyle::Danger);
        assert!(buttons[1].disabled);
    }

    #[test]
    fn seven_options_pack_into_a_row_of_five_and_a_row_of_two() {
        let options =
            ["Mon 7pm", "Tue 7pm", "Wed 7pm", "Thu 7pm", "Fri 7pm", "Sat 2pm", "Sun 2pm"];
        let group = time_selection_group(options);

        assert_eq!(group.rows.len(), 2);
        assert_eq!(group.rows[0].buttons.len(), MAX_BUTTONS_PER_ROW);
        assert_eq!(group.rows[1].buttons.len(), 2);

        let ids: Vec<_> = group.buttons().map(|button| button.id.as_str()).collect();
        assert_eq!(
            ids,
            vec![
                "time_Mon 7pm",
                "time_Tue 7pm",
                "time_Wed 7pm",
                "time_Thu 7pm",
                "time_Fri 7pm",
                "time_Sat 2pm",
                "time_Sun 2pm",
            ]
        );
        assert!(group.buttons().all(|button| !button.disabled));
        assert!(group.buttons().all(|button| button.style == ButtonStyle::Secondary));
    }

    #[test]
    fn exactly_five_options_stay_in_one_row() {
        let group = time_selection_group(["a", "b", "c", "d", "e"]);
        assert_eq!(group.rows.len(), 1);
        assert_eq!(group.rows[0].buttons.len(), 5);
    }

    #[test]
    fn selection_promotes_the_match_and_disables_everything() {
        let group = time_selection_group(["Monday", "Tuesday"]);
        let locked = with_selection(&group, "Monday");

        let monday = locked.find("Monday").expect("monday button");
        assert_eq!(monday.style, ButtonStyle::Primary);
        assert!(monday.disabled);

        let tuesday = locked.find("Tuesday").expect("tuesday button");
        assert_eq!(tuesday.style, ButtonStyle::Secondary);
        assert!(tuesday.disabled);

        // Original group is untouched.
        assert!(group.buttons().all(|button| !button.disabled));
    }

    #[test]
    fn selection_is_idempotent() {
        let group = time_selection_group(["Monday", "Tuesday"]);
        let once = with_selection(&group, "time_Monday");
        let twice = with_selection(&once, "time_Monday");
        assert_eq!(once, twice);
    }

    #[test]
    fn a_locked_group_has_at_most_one_primary_button() {
        let locked = with_selection(&confirmation_group(false, false), "cancel");
        let primaries =
            locked.buttons().filter(|button| button.style == ButtonStyle::Primary).count();
        assert_eq!(primaries, 1);
        assert!(locked.buttons().all(|button| button.disabled));
        assert_eq!(
            locked.find("confirm").map(|button| button.style),
            Some(ButtonStyle::Success)
        );
    }
}
