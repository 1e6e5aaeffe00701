use super::actions::{CardEvent, CardOutcome, OptionEdit, StageSelection, UploadEdit};
use super::card::CardState;

/// Applies one interaction to a card and reports the save urgency and any
/// catalog lookups it started. Payload and error slots are consistent with
/// the new inputs by the time this returns.
pub fn apply_card_event(card: &mut CardState, event: CardEvent) -> CardOutcome {
    if !card.is_ready() {
        log::debug!("{} not ready; dropping {event:?}", card.id());
        return CardOutcome::none();
    }

    let outcome = match event {
        CardEvent::TypeChanged { question_type } => {
            card.question_type = question_type;
            card.apply_visibility();
            CardOutcome::debounced().with_loads(card.ensure_cascade())
        }
        CardEvent::OriginChanged { source } => {
            card.origin = Some(source);
            card.origin_choice = Some(source);
            card.apply_visibility();
            CardOutcome::debounced().with_loads(card.ensure_cascade())
        }
        CardEvent::LabelEdited { text } => {
            card.label = text;
            CardOutcome::debounced()
        }
        CardEvent::HelpEdited { text } => {
            card.help = text;
            CardOutcome::debounced()
        }
        CardEvent::RequiredToggled { on } => {
            card.required = on;
            CardOutcome::debounced()
        }
        CardEvent::OptionEdited { edit } => edit_options(card, edit),
        CardEvent::UploadConfigChanged { edit } => edit_upload(card, edit),
        CardEvent::ExternalStageChanged { selection } => select_stage(card, selection),
    };

    card.refresh();
    outcome
}

fn edit_options(card: &mut CardState, edit: OptionEdit) -> CardOutcome {
    match edit {
        OptionEdit::Add => {
            card.option_rows.push(String::new());
            CardOutcome::none()
        }
        OptionEdit::Set { index, text } => match card.option_rows.get_mut(index) {
            Some(row) => {
                *row = text;
                CardOutcome::debounced()
            }
            None => CardOutcome::none(),
        },
        OptionEdit::Remove { index } if index < card.option_rows.len() => {
            card.option_rows.remove(index);
            CardOutcome::debounced()
        }
        OptionEdit::Remove { .. } => CardOutcome::none(),
    }
}

fn edit_upload(card: &mut CardState, edit: UploadEdit) -> CardOutcome {
    match edit {
        UploadEdit::RestrictToggled { on } => {
            card.upload.restrict_to_categories = on;
            CardOutcome::immediate()
        }
        UploadEdit::CategoryToggled { name, checked } => {
            if card.upload.set_category(&name, checked) {
                CardOutcome::immediate()
            } else {
                CardOutcome::none()
            }
        }
        UploadEdit::MaxFiles { raw } => {
            card.upload.max_files = raw;
            CardOutcome::debounced()
        }
        UploadEdit::MaxSizeMb { raw } => {
            card.upload.max_size_mb = raw;
            CardOutcome::debounced()
        }
    }
}

fn select_stage(card: &mut CardState, selection: StageSelection) -> CardOutcome {
    let loads = match selection {
        StageSelection::Connection { id } => card.cascade.select_connection(id),
        StageSelection::Query { id } => card.cascade.select_query(id),
        StageSelection::ValueField { column } => {
            card.cascade.select_value_field(column);
            Vec::new()
        }
        StageSelection::LabelField { column } => {
            card.cascade.select_label_field(column);
            Vec::new()
        }
    };
    CardOutcome::debounced().with_loads(loads)
}
