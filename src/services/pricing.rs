// src/services/pricing.rs
//
// Regras de preço puras (sem banco): preço por unidade de análise,
// percentual de reajuste e a resolução "hoja ou preço atual".
// Tudo em Decimal de ponto fixo; nada de f64 aqui.

use std::collections::HashMap;
use std::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::{
        price_sheets::SheetLine,
        resources::{Currency, Labor, Material, Priced, ResourcePrice, Subcontract},
    },
};

/// Casas decimais gravadas em `unit_price_sale_unit` (NUMERIC(12, 4)).
pub const STORED_SCALE: u32 = 4;

/// Preço por unidade de análise: quantidade por unidade de venda × preço de venda.
/// Zero exato quando falta algum dos operandos.
pub fn analysis_price(
    quantity_per_sale_unit: Option<Decimal>,
    unit_price_sale_unit: Option<Decimal>,
) -> Decimal {
    match (quantity_per_sale_unit, unit_price_sale_unit) {
        (Some(quantity), Some(price)) => quantity * price,
        _ => Decimal::ZERO,
    }
}

// ---
// O "formato" de preço comum a recursos e linhas de hoja
// ---
pub trait PricedResource {
    fn resource_id(&self) -> Uuid;
    fn quantity_per_sale_unit(&self) -> Option<Decimal>;
    fn unit_price_sale_unit(&self) -> Option<Decimal>;

    fn currency(&self) -> Option<Currency> {
        None
    }

    fn analysis_unit_price(&self) -> Decimal {
        analysis_price(self.quantity_per_sale_unit(), self.unit_price_sale_unit())
    }
}

impl PricedResource for Material {
    fn resource_id(&self) -> Uuid {
        self.id
    }
    fn quantity_per_sale_unit(&self) -> Option<Decimal> {
        Some(self.quantity_per_sale_unit)
    }
    fn unit_price_sale_unit(&self) -> Option<Decimal> {
        Some(self.unit_price_sale_unit)
    }
    fn currency(&self) -> Option<Currency> {
        Some(self.currency)
    }
}

impl PricedResource for Labor {
    fn resource_id(&self) -> Uuid {
        self.id
    }
    fn quantity_per_sale_unit(&self) -> Option<Decimal> {
        Some(self.quantity_per_sale_unit)
    }
    fn unit_price_sale_unit(&self) -> Option<Decimal> {
        Some(self.unit_price_sale_unit)
    }
}

impl PricedResource for Subcontract {
    fn resource_id(&self) -> Uuid {
        self.id
    }
    fn quantity_per_sale_unit(&self) -> Option<Decimal> {
        Some(self.quantity_per_sale_unit)
    }
    fn unit_price_sale_unit(&self) -> Option<Decimal> {
        Some(self.unit_price_sale_unit)
    }
    fn currency(&self) -> Option<Currency> {
        Some(self.currency)
    }
}

impl PricedResource for ResourcePrice {
    fn resource_id(&self) -> Uuid {
        self.id
    }
    fn quantity_per_sale_unit(&self) -> Option<Decimal> {
        Some(self.quantity_per_sale_unit)
    }
    fn unit_price_sale_unit(&self) -> Option<Decimal> {
        Some(self.unit_price_sale_unit)
    }
    fn currency(&self) -> Option<Currency> {
        self.currency
    }
}

impl PricedResource for SheetLine {
    fn resource_id(&self) -> Uuid {
        self.resource_id
    }
    fn quantity_per_sale_unit(&self) -> Option<Decimal> {
        Some(self.quantity_per_sale_unit)
    }
    fn unit_price_sale_unit(&self) -> Option<Decimal> {
        Some(self.unit_price_sale_unit)
    }
    fn currency(&self) -> Option<Currency> {
        self.currency
    }
}

pub fn with_analysis_price<T: PricedResource>(resource: T) -> Priced<T> {
    let analysis_unit_price = resource.analysis_unit_price();
    Priced {
        resource,
        analysis_unit_price,
    }
}

// ---
// Percentual de reajuste
// ---

/// Aceita "10", "10.5", "10,5" e "10,5 %". Abaixo de -100% o preço ficaria negativo.
pub fn parse_percentage(raw: &str) -> Result<Decimal, AppError> {
    let normalized = raw.trim().trim_end_matches('%').trim().replace(',', ".");

    let percentage = Decimal::from_str(&normalized)
        .map_err(|_| AppError::InvalidPercentage(raw.to_string()))?;

    if percentage < -Decimal::ONE_HUNDRED {
        return Err(AppError::InvalidPercentage(raw.to_string()));
    }
    Ok(percentage)
}

/// Fator multiplicativo `1 + p/100`.
pub fn percentage_factor(percentage: Decimal) -> Decimal {
    Decimal::ONE + percentage / Decimal::ONE_HUNDRED
}

/// Mesmo cálculo do UPDATE em massa (`ROUND(preço * fator, 4)`), com o
/// arredondamento "meio para longe do zero" do Postgres.
pub fn apply_percentage(price: Decimal, percentage: Decimal) -> Decimal {
    (price * percentage_factor(percentage))
        .round_dp_with_strategy(STORED_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

// ---
// Limites das colunas NUMERIC
// ---

/// Dígitos inteiros de `unit_price_sale_unit` e das cotações (NUMERIC(12, 4)).
pub const PRICE_DIGITS: u32 = 8;
/// Dígitos inteiros de `quantity_per_sale_unit` (NUMERIC(10, 4)).
pub const RESOURCE_QUANTITY_DIGITS: u32 = 6;
/// Dígitos inteiros da quantidade de uma linha de mezcla (NUMERIC(12, 4)).
pub const LINE_QUANTITY_DIGITS: u32 = 8;

/// O valor, arredondado na 4ª casa como o Postgres grava, cabe na coluna.
pub fn fits_column(value: Decimal, integer_digits: u32) -> bool {
    let rounded = value.round_dp_with_strategy(STORED_SCALE, RoundingStrategy::MidpointAwayFromZero);
    rounded.abs() < Decimal::from(10u64.pow(integer_digits))
}

// ---
// Resolução "hoja ou atual"
// ---

/// As linhas de uma hoja, indexadas pelo recurso. Carregada a cada cálculo.
#[derive(Debug, Clone)]
pub struct SheetSnapshot {
    pub sheet_id: Uuid,
    lines: HashMap<Uuid, SheetLine>,
}

impl SheetSnapshot {
    pub fn from_lines(sheet_id: Uuid, lines: Vec<SheetLine>) -> Self {
        let lines = lines
            .into_iter()
            .map(|line| (line.resource_id, line))
            .collect();
        Self { sheet_id, lines }
    }

    pub fn line_for(&self, resource_id: Uuid) -> Option<&SheetLine> {
        self.lines.get(&resource_id)
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedPrice {
    pub quantity_per_sale_unit: Decimal,
    pub unit_price_sale_unit: Decimal,
    pub currency: Option<Currency>,
    /// Falso só quando a hoja não tem linha para o recurso.
    pub captured: bool,
}

impl ResolvedPrice {
    pub fn analysis_unit_price(&self) -> Decimal {
        analysis_price(
            Some(self.quantity_per_sale_unit),
            Some(self.unit_price_sale_unit),
        )
    }
}

/// Ponto único de resolução, usado pela listagem da hoja e pelo custo da mezcla.
/// - com hoja e linha: valores congelados;
/// - com hoja e sem linha: zero (lacuna, não é erro);
/// - sem hoja: valores atuais do recurso.
pub fn resolve_line<R>(resource: &R, snapshot: Option<&SheetSnapshot>) -> ResolvedPrice
where
    R: PricedResource + ?Sized,
{
    match snapshot {
        Some(snapshot) => match snapshot.line_for(resource.resource_id()) {
            Some(line) => ResolvedPrice {
                quantity_per_sale_unit: line.quantity_per_sale_unit,
                unit_price_sale_unit: line.unit_price_sale_unit,
                currency: line.currency,
                captured: true,
            },
            None => ResolvedPrice {
                quantity_per_sale_unit: Decimal::ZERO,
                unit_price_sale_unit: Decimal::ZERO,
                currency: resource.currency(),
                captured: false,
            },
        },
        None => ResolvedPrice {
            quantity_per_sale_unit: resource.quantity_per_sale_unit().unwrap_or(Decimal::ZERO),
            unit_price_sale_unit: resource.unit_price_sale_unit().unwrap_or(Decimal::ZERO),
            currency: resource.currency(),
            captured: true,
        },
    }
}

/// Preço por unidade de venda do recurso na hoja (ou atual).
pub fn resolve_price<R>(resource: &R, snapshot: Option<&SheetSnapshot>) -> Decimal
where
    R: PricedResource + ?Sized,
{
    resolve_line(resource, snapshot).unit_price_sale_unit
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::Utc;

    pub(crate) fn dec(raw: &str) -> Decimal {
        Decimal::from_str(raw).unwrap()
    }

    pub(crate) fn material(quantity: &str, price: &str) -> Material {
        Material {
            id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            name: "Cemento".into(),
            supplier_id: None,
            type_id: Uuid::new_v4(),
            category_id: Uuid::new_v4(),
            sale_unit_id: Uuid::new_v4(),
            quantity_per_sale_unit: dec(quantity),
            unit_price_sale_unit: dec(price),
            currency: Currency::Ars,
            created_at: Utc::now(),
        }
    }

    pub(crate) fn line_for(sheet_id: Uuid, resource: &Material) -> SheetLine {
        SheetLine {
            id: Uuid::new_v4(),
            sheet_id,
            resource_id: resource.id,
            quantity_per_sale_unit: resource.quantity_per_sale_unit,
            unit_price_sale_unit: resource.unit_price_sale_unit,
            currency: Some(resource.currency),
        }
    }

    #[test]
    fn analysis_price_is_quantity_times_price() {
        assert_eq!(analysis_price(Some(dec("2.5")), Some(dec("40.00"))), dec("100.000"));
        let m = material("1", "100.00");
        assert_eq!(m.analysis_unit_price(), dec("100.00"));
    }

    #[test]
    fn analysis_price_is_zero_when_an_operand_is_missing() {
        assert_eq!(analysis_price(None, Some(dec("10"))), Decimal::ZERO);
        assert_eq!(analysis_price(Some(dec("10")), None), Decimal::ZERO);
        assert_eq!(analysis_price(None, None), Decimal::ZERO);
    }

    #[test]
    fn percentage_accepts_comma_and_dot() {
        assert_eq!(parse_percentage("10,5").unwrap(), dec("10.5"));
        assert_eq!(parse_percentage(" 10.5 ").unwrap(), dec("10.5"));
        assert_eq!(parse_percentage("-3 %").unwrap(), dec("-3"));
        assert_eq!(parse_percentage("0").unwrap(), Decimal::ZERO);
    }

    #[test]
    fn percentage_rejects_garbage_and_below_minus_hundred() {
        assert!(matches!(parse_percentage("abc"), Err(AppError::InvalidPercentage(_))));
        assert!(matches!(parse_percentage(""), Err(AppError::InvalidPercentage(_))));
        assert!(matches!(parse_percentage("-150"), Err(AppError::InvalidPercentage(_))));
        assert_eq!(parse_percentage("-100").unwrap(), dec("-100"));
    }

    #[test]
    fn ten_percent_increase_on_one_hundred() {
        assert_eq!(apply_percentage(dec("100.0000"), dec("10")), dec("110.0000"));
        assert_eq!(apply_percentage(dec("100.00"), Decimal::ZERO), dec("100.00"));
    }

    #[test]
    fn successive_updates_compose_multiplicatively() {
        let price = dec("1234.5678");
        let (p, q) = (dec("7.5"), dec("-3.25"));
        let twice = apply_percentage(apply_percentage(price, p), q);

        let combined = (percentage_factor(p) * percentage_factor(q) - Decimal::ONE)
            * Decimal::ONE_HUNDRED;
        let once = apply_percentage(price, combined);

        // Só diverge pelo arredondamento intermediário na 4ª casa.
        assert!((twice - once).abs() <= dec("0.0001"));
    }

    #[test]
    fn column_limit_counts_the_stored_rounding() {
        assert!(fits_column(dec("99999999.9999"), PRICE_DIGITS));
        assert!(fits_column(dec("-99999999.9999"), PRICE_DIGITS));
        assert!(!fits_column(dec("100000000"), PRICE_DIGITS));
        // Arredonda para 100000000.0000 ao gravar.
        assert!(!fits_column(dec("99999999.99995"), PRICE_DIGITS));
        assert!(fits_column(dec("999999.9999"), RESOURCE_QUANTITY_DIGITS));
        assert!(!fits_column(dec("1000000"), RESOURCE_QUANTITY_DIGITS));
    }

    #[test]
    fn resolves_live_price_without_sheet() {
        let m = material("1", "150.00");
        assert_eq!(resolve_price(&m, None), dec("150.00"));
        assert!(resolve_line(&m, None).captured);
    }

    #[test]
    fn sheet_keeps_frozen_value_after_live_change() {
        let mut m = material("1", "100.00");
        let sheet_id = Uuid::new_v4();
        let snapshot = SheetSnapshot::from_lines(sheet_id, vec![line_for(sheet_id, &m)]);

        m.unit_price_sale_unit = dec("150.00");

        assert_eq!(resolve_price(&m, Some(&snapshot)), dec("100.00"));
        assert_eq!(resolve_price(&m, None), dec("150.00"));
    }

    #[test]
    fn sheet_gap_resolves_to_zero() {
        let m = material("1", "100.00");
        let snapshot = SheetSnapshot::from_lines(Uuid::new_v4(), Vec::new());

        let resolved = resolve_line(&m, Some(&snapshot));
        assert_eq!(resolved.unit_price_sale_unit, Decimal::ZERO);
        assert_eq!(resolved.analysis_unit_price(), Decimal::ZERO);
        assert!(!resolved.captured);
    }

    #[test]
    fn priced_wrapper_serializes_flat() {
        let m = material("2", "10");
        let json = serde_json::to_value(with_analysis_price(m)).unwrap();
        assert_eq!(json["name"], "Cemento");
        assert_eq!(json["analysisUnitPrice"], "20");
    }
}
