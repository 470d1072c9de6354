use chrono::{DateTime, FixedOffset, Utc};
use std::collections::BTreeSet;
use std::fmt::Write as _;

use crate::api::models::ContactRecord;

const COMENTARIO_WIDTH: usize = 40;

pub fn tag_label(tag: &str) -> &str {
    match tag {
        "mercado-libre" => "Mercado Libre",
        "ecommerce" => "E-commerce",
        "privado" => "Privado",
        other => other,
    }
}

pub fn badges(tags: &BTreeSet<String>) -> String {
    if tags.is_empty() {
        return "Ninguno".to_string();
    }
    tags.iter().map(|t| tag_label(t)).collect::<Vec<_>>().join(", ")
}

pub fn format_fecha(fecha: &DateTime<Utc>, offset: &FixedOffset) -> String {
    fecha.with_timezone(offset).format("%d %b %Y %H:%M").to_string()
}

/// Text for the bell badge; hidden when nothing is unread.
pub fn unread_badge(count: usize) -> Option<String> {
    match count {
        0 => None,
        1..=99 => Some(count.to_string()),
        _ => Some("99+".to_string()),
    }
}

fn truncate(text: &str, width: usize) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(width).collect();
    if chars.next().is_some() { format!("{head}…") } else { head }
}

/// One rendering of the dashboard: counters, badge and the filtered rows.
pub struct TableView<'a> {
    pub rows: Vec<&'a ContactRecord>,
    pub total: usize,
    pub unread: usize,
    pub offset: FixedOffset,
}

impl TableView<'_> {
    /// `is_unread` marks rows the user has not acknowledged yet.
    pub fn render(&self, is_unread: impl Fn(&str) -> bool) -> String {
        let mut out = String::new();
        let _ = write!(out, "Consultas: {}  Mostrando: {}", self.total, self.rows.len());
        if let Some(badge) = unread_badge(self.unread) {
            let _ = write!(out, "  Nuevas: {badge}");
        }
        out.push('\n');

        if self.rows.is_empty() {
            out.push_str("No hay consultas para mostrar.\n");
            return out;
        }

        for rec in &self.rows {
            let marker = if is_unread(&rec.id) { '*' } else { ' ' };
            let _ = writeln!(
                out,
                "{marker} {} | {} | {} | {} | {} | {} | {} | {}",
                rec.id,
                rec.nombre,
                rec.cedula,
                rec.telefono,
                rec.email,
                badges(&rec.paqueteria),
                truncate(&rec.comentario, COMENTARIO_WIDTH),
                format_fecha(&rec.fecha, &self.offset),
            );
        }
        out
    }
}
