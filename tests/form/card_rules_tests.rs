use formdeck::domain::{FieldKind, OptionsSource, QuestionType, default_category_names};
use formdeck::form::{
    CardEvent, CardId, CardState, ErrorSlot, MSG_CATEGORY_REQUIRED, MSG_OPTIONS_REQUIRED,
    OptionEdit, PanelVisibility, UploadEdit, parse_limit,
};
use indexmap::IndexMap;
use serde_json::Value;

fn ready_card(fields: &[(&str, &str)]) -> CardState {
    let fields: IndexMap<String, String> = fields
        .iter()
        .map(|(name, value)| (name.to_string(), value.to_string()))
        .collect();
    let mut card = CardState::from_fields(CardId(1), &fields, &default_category_names());
    card.init();
    card
}

fn expected_slot(question_type: Option<QuestionType>, source: OptionsSource) -> Option<FieldKind> {
    match (question_type, source) {
        (Some(QuestionType::MultipleChoice | QuestionType::CheckboxGroup), _) => {
            Some(FieldKind::Options)
        }
        (Some(QuestionType::List), OptionsSource::Manual) => Some(FieldKind::Options),
        (Some(QuestionType::List), OptionsSource::ExternalCatalog) => {
            Some(FieldKind::ExternalSource)
        }
        (Some(QuestionType::FileUpload), _) => Some(FieldKind::UploadConstraints),
        _ => None,
    }
}

#[test]
fn every_type_and_source_has_at_most_one_active_slot() {
    let types = std::iter::once(None).chain(QuestionType::ALL.into_iter().map(Some));
    for question_type in types {
        for source in OptionsSource::ALL {
            let wire_type = question_type.map_or("", QuestionType::wire_name);
            let card = ready_card(&[
                ("tipo", wire_type),
                ("rotulo", "Pergunta"),
                ("origem_opcoes", source.wire_name()),
            ]);
            let expected = expected_slot(question_type, source);
            let context = format!("{question_type:?} / {source:?}");

            assert_eq!(
                PanelVisibility::resolve(question_type, source).active_slot(),
                expected,
                "{context}"
            );
            let active: Vec<FieldKind> = card.active_fields().iter().copied().collect();
            assert_eq!(active, expected.into_iter().collect::<Vec<_>>(), "{context}");

            let emitted: Vec<String> = card
                .form_fields()
                .into_iter()
                .map(|(name, _)| name)
                .filter(|name| FieldKind::from_wire(name).is_some())
                .collect();
            assert_eq!(
                emitted,
                expected
                    .map(|kind| vec![kind.wire_name().to_string()])
                    .unwrap_or_default(),
                "{context}"
            );
        }
    }
}

#[test]
fn options_payload_is_stable_across_restoration() {
    let samples: &[&[&str]] = &[
        &["Sim", "Não"],
        &[" talvez ", "Sim", "Sim"],
        &["1", "dois", "três & quatro", "\"aspas\""],
        &["única"],
    ];
    for rows in samples {
        let mut card = ready_card(&[("tipo", "multipla"), ("rotulo", "Humor")]);
        let start = card.option_rows().len();
        for (offset, text) in rows.iter().enumerate() {
            card.handle(CardEvent::OptionEdited {
                edit: OptionEdit::Add,
            });
            card.handle(CardEvent::OptionEdited {
                edit: OptionEdit::Set {
                    index: start + offset,
                    text: text.to_string(),
                },
            });
        }
        card.sync_payloads();
        let first = card.slot_value(FieldKind::Options).to_string();

        let mut restored = ready_card(&[
            ("tipo", "multipla"),
            ("rotulo", "Humor"),
            ("opcoes_json", &first),
        ]);
        restored.sync_payloads();
        assert_eq!(restored.slot_value(FieldKind::Options), first, "{rows:?}");
    }
}

#[test]
fn upload_limits_never_serialize_below_one() {
    let inputs = [
        "", "0", "-3", "abc", "  12kb", "+4", "-0", "99999999999999999999", "1.5",
    ];
    for raw in inputs {
        assert!(parse_limit(raw, 1) >= 1, "{raw:?}");
        assert!(parse_limit(raw, 10) >= 1, "{raw:?}");

        let mut card = ready_card(&[("tipo", "arquivo"), ("rotulo", "Anexo")]);
        card.handle(CardEvent::UploadConfigChanged {
            edit: UploadEdit::MaxFiles { raw: raw.into() },
        });
        card.handle(CardEvent::UploadConfigChanged {
            edit: UploadEdit::MaxSizeMb { raw: raw.into() },
        });
        let payload: Value =
            serde_json::from_str(card.slot_value(FieldKind::UploadConstraints)).unwrap();
        assert!(payload["max_arquivos"].as_i64().unwrap() >= 1, "{raw:?}");
        assert!(payload["max_mb"].as_i64().unwrap() >= 1, "{raw:?}");
    }
}

#[test]
fn checkbox_group_drops_blank_rows() {
    let mut card = ready_card(&[("tipo", "checkbox"), ("rotulo", "Cores")]);
    let start = card.option_rows().len();
    for _ in 0..3 {
        card.handle(CardEvent::OptionEdited {
            edit: OptionEdit::Add,
        });
    }
    for (index, text) in [(start, "Red"), (start + 2, "Blue")] {
        card.handle(CardEvent::OptionEdited {
            edit: OptionEdit::Set {
                index,
                text: text.into(),
            },
        });
    }
    assert_eq!(card.slot_value(FieldKind::Options), r#"["Red","Blue"]"#);
    assert!(!card.has_problems());
}

#[test]
fn manual_list_without_options_is_flagged() {
    let mut card = ready_card(&[
        ("tipo", "lista"),
        ("rotulo", "Estado"),
        ("origem_opcoes", "manual"),
    ]);
    card.sync_payloads();
    assert_eq!(
        card.errors().get(ErrorSlot::Options),
        Some(MSG_OPTIONS_REQUIRED)
    );
    assert_eq!(card.slot_value(FieldKind::Options), "[]");
}

#[test]
fn restricted_upload_without_categories_still_serializes() {
    let mut card = ready_card(&[("tipo", "arquivo"), ("rotulo", "Anexo")]);
    card.handle(CardEvent::UploadConfigChanged {
        edit: UploadEdit::RestrictToggled { on: true },
    });
    assert_eq!(
        card.errors().get(ErrorSlot::UploadCategories),
        Some(MSG_CATEGORY_REQUIRED)
    );
    let payload: Value =
        serde_json::from_str(card.slot_value(FieldKind::UploadConstraints)).unwrap();
    assert_eq!(payload["tipos_livres"], false);
    assert_eq!(payload["categorias"], Value::Array(Vec::new()));
}

#[test]
fn external_list_reports_missing_cascade_parts() {
    let card = ready_card(&[
        ("tipo", "lista"),
        ("rotulo", "Cliente"),
        ("origem_opcoes", "sqlhub"),
        (
            "sqlhub_json",
            r#"{"connection_id":1,"query_id":null,"value_field":null,"label_field":null}"#,
        ),
    ]);
    assert_eq!(
        card.errors().get(ErrorSlot::ExternalSource),
        Some("Missing: Query, Value field, Label field")
    );
}
