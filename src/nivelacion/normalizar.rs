// Normalización de nombres (carreras, ramos) para agrupar y emparejar.

/// Normaliza un nombre human-readable: minúsculas, elimina acentos, convierte
/// puntuación a espacios y colapsa espacios múltiples.
pub fn normalize_name(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    // mapa simple de acentos comunes en español/latam
    for ch in s.chars() {
        let c = match ch {
            'Á' | 'À' | 'Ä' | 'Â' | 'Ã' | 'á' | 'à' | 'ä' | 'â' | 'ã' => 'a',
            'É' | 'È' | 'Ë' | 'Ê' | 'é' | 'è' | 'ë' | 'ê' => 'e',
            'Í' | 'Ì' | 'Ï' | 'Î' | 'í' | 'ì' | 'ï' | 'î' => 'i',
            'Ó' | 'Ò' | 'Ö' | 'Ô' | 'Õ' | 'ó' | 'ò' | 'ö' | 'ô' | 'õ' => 'o',
            'Ú' | 'Ù' | 'Ü' | 'Û' | 'ú' | 'ù' | 'ü' | 'û' => 'u',
            'Ñ' | 'ñ' => 'n',
            'Ç' | 'ç' => 'c',
            other => other,
        };

        if c.is_alphanumeric() {
            out.push(c.to_ascii_lowercase());
        } else {
            // espacios y puntuación -> espacio
            out.push(' ');
        }
    }

    // colapsar espacios múltiples
    let mut res = String::with_capacity(out.len());
    let mut prev_space = false;
    for ch in out.chars() {
        if ch == ' ' {
            if !prev_space {
                res.push(' ');
                prev_space = true;
            }
        } else {
            res.push(ch);
            prev_space = false;
        }
    }
    res.trim().to_string()
}

/// Busca el candidato más parecido a `nombre` (por nombre normalizado) usando
/// jaro-winkler. Devuelve el candidato original si supera el umbral; empates
/// se resuelven por orden lexicográfico para mantener la salida determinista.
pub fn sugerencia_cercana<'a, I>(nombre: &str, candidatos: I) -> Option<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    let objetivo = normalize_name(nombre);
    let mut mejor: Option<(&'a str, f64)> = None;
    for cand in candidatos {
        let score = strsim::jaro_winkler(&objetivo, &normalize_name(cand));
        let gana = match mejor {
            None => true,
            Some((prev, prev_score)) => {
                score > prev_score || (score == prev_score && cand < prev)
            }
        };
        if gana {
            mejor = Some((cand, score));
        }
    }
    match mejor {
        Some((cand, score)) if score >= 0.85 => Some(cand),
        _ => None,
    }
}
