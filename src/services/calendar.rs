// src/services/calendar.rs
//
// Grade mensal de disponibilidade. Cada célula tem exatamente um
// estado, recalculado por inteiro a cada geração — nada incremental.

use chrono::{Datelike, Duration, NaiveDate};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayState {
    Available,
    Occupied,
    /// Passado ou fora do mês exibido, independente de ocupação.
    Blocked,
}

#[derive(Debug, Clone)]
pub struct CalendarDay {
    pub date: NaiveDate,
    pub iso: String,
    pub number: u32,
    pub state: DayState,
    pub is_today: bool,
    pub in_month: bool,
    pub selected: bool,
}

#[derive(Debug, Clone)]
pub struct CalendarMonth {
    pub year: i32,
    pub month: u32,
    pub title: String,
    /// Semanas completas, segunda-feira primeiro: 35 ou 42 células.
    pub weeks: Vec<Vec<CalendarDay>>,
}

impl CalendarMonth {
    pub fn cells(&self) -> usize {
        self.weeks.iter().map(Vec::len).sum()
    }
}

/// Estado navegável do calendário de uma finca: mês exibido, conjunto
/// de datas ocupadas e a seleção atual.
#[derive(Debug, Clone)]
pub struct CalendarView {
    pub year: i32,
    pub month: u32,
    pub occupied: BTreeSet<NaiveDate>,
    pub selected: Option<NaiveDate>,
}

impl CalendarView {
    pub fn new(today: NaiveDate) -> Self {
        Self {
            year: today.year(),
            month: today.month(),
            occupied: BTreeSet::new(),
            selected: None,
        }
    }

    pub fn set_occupied(&mut self, fechas: BTreeSet<NaiveDate>) {
        self.occupied = fechas;
    }

    /// Passo de mês (±n). A grade do novo mês se recalcula com o mesmo
    /// algoritmo na próxima geração.
    pub fn shift_month(&mut self, delta: i32) {
        let total = self.year * 12 + self.month as i32 - 1 + delta;
        self.year = total.div_euclid(12);
        self.month = (total.rem_euclid(12) + 1) as u32;
    }

    /// Seleção local pura: exige célula disponível, do mês exibido e
    /// sessão autenticada. Nenhuma chamada de backend.
    pub fn select(&mut self, dia: &CalendarDay, authenticated: bool) -> bool {
        if dia.state != DayState::Available || !dia.in_month || !authenticated {
            return false;
        }
        self.selected = Some(dia.date);
        true
    }

    pub fn clear_selection(&mut self) {
        self.selected = None;
    }

    pub fn generate(&self, today: NaiveDate) -> CalendarMonth {
        generate_month(self.year, self.month, &self.occupied, self.selected, today)
    }
}

/// Gera a grade de um mês. Deslocamento inicial com segunda-feira como
/// primeiro dia; total de células arredondado para semanas cheias.
pub fn generate_month(
    year: i32,
    month: u32,
    occupied: &BTreeSet<NaiveDate>,
    selected: Option<NaiveDate>,
    today: NaiveDate,
) -> CalendarMonth {
    let title = month_title(year, month);

    let Some(primero) = NaiveDate::from_ymd_opt(year, month, 1) else {
        return CalendarMonth { year, month, title, weeks: Vec::new() };
    };

    let offset = primero.weekday().num_days_from_monday() as i64;
    let dias_en_mes = days_in_month(primero);
    let total_celdas = ((offset + dias_en_mes) as u64).div_ceil(7) as i64 * 7;

    let mut weeks: Vec<Vec<CalendarDay>> = Vec::new();
    for i in 0..total_celdas {
        let fecha = primero + Duration::days(i - offset);
        let es_del_mes = i >= offset && i < offset + dias_en_mes;
        let es_pasado = fecha < today;
        let ocupado = es_del_mes && occupied.contains(&fecha);

        let estado = if !es_del_mes || es_pasado {
            DayState::Blocked
        } else if ocupado {
            DayState::Occupied
        } else {
            DayState::Available
        };

        let dia = CalendarDay {
            date: fecha,
            iso: fecha.format("%Y-%m-%d").to_string(),
            number: fecha.day(),
            state: estado,
            is_today: fecha == today,
            in_month: es_del_mes,
            selected: selected == Some(fecha),
        };

        if i % 7 == 0 {
            weeks.push(Vec::with_capacity(7));
        }
        if let Some(semana) = weeks.last_mut() {
            semana.push(dia);
        }
    }

    CalendarMonth { year, month, title, weeks }
}

fn days_in_month(primero: NaiveDate) -> i64 {
    let (year, month) = (primero.year(), primero.month());
    let siguiente = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    };

    match siguiente {
        Some(siguiente) => (siguiente - primero).num_days(),
        None => 30,
    }
}

fn month_title(year: i32, month: u32) -> String {
    const MESES: [&str; 12] = [
        "Enero",
        "Febrero",
        "Marzo",
        "Abril",
        "Mayo",
        "Junio",
        "Julio",
        "Agosto",
        "Septiembre",
        "Octubre",
        "Noviembre",
        "Diciembre",
    ];

    match MESES.get(month as usize - 1) {
        Some(nombre) => format!("{nombre} {year}"),
        None => format!("{month}/{year}"),
    }
}
