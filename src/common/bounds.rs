#[derive(Debug, Clone, Copy)]
pub struct TBounds3<T: na::RealField> {
    pub p_min: na::Point3<T>,
    pub p_max: na::Point3<T>,
}

pub fn min_p<T: na::RealField>(p1: &na::Point3<T>, p2: &na::Point3<T>) -> na::Point3<T> {
    na::Point3::new(
        na::RealField::min(p1.x.clone(), p2.x.clone()),
        na::RealField::min(p1.y.clone(), p2.y.clone()),
        na::RealField::min(p1.z.clone(), p2.z.clone()),
    )
}

pub fn max_p<T: na::RealField>(p1: &na::Point3<T>, p2: &na::Point3<T>) -> na::Point3<T> {
    na::Point3::new(
        na::RealField::max(p1.x.clone(), p2.x.clone()),
        na::RealField::max(p1.y.clone(), p2.y.clone()),
        na::RealField::max(p1.z.clone(), p2.z.clone()),
    )
}

impl<T: na::RealField> TBounds3<T> {
    pub fn new(p1: na::Point3<T>, p2: na::Point3<T>) -> Self {
        TBounds3 {
            p_min: min_p(&p1, &p2),
            p_max: max_p(&p1, &p2),
        }
    }

    pub fn from_point(p: na::Point3<T>) -> Self {
        TBounds3 {
            p_min: p.clone(),
            p_max: p,
        }
    }
}

pub type Bounds3 = TBounds3<f32>;

impl<T: na::RealField + na::ClosedSub> TBounds3<T> {
    pub fn empty() -> Self {
        let min_num = T::min_value().unwrap();
        let max_num = T::max_value().unwrap();

        TBounds3 {
            p_min: na::Point3::new(max_num.clone(), max_num.clone(), max_num),
            p_max: na::Point3::new(min_num.clone(), min_num.clone(), min_num),
        }
    }

    pub fn diagonal(&self) -> na::Vector3<T> {
        self.p_max.coords.clone() - self.p_min.coords.clone()
    }

    pub fn maximum_extent(&self) -> usize {
        self.diagonal().imax()
    }

    pub fn offset(&self, p: &na::Point3<T>) -> na::Vector3<T> {
        let mut o = p - self.p_min.clone();
        if self.p_max.x > self.p_min.x {
            o.x /= self.p_max.x.clone() - self.p_min.x.clone();
        }
        if self.p_max.y > self.p_min.y {
            o.y /= self.p_max.y.clone() - self.p_min.y.clone();
        }
        if self.p_max.z > self.p_min.z {
            o.z /= self.p_max.z.clone() - self.p_min.z.clone();
        }

        o
    }

    pub fn surface_area(&self) -> T {
        let d = self.diagonal();
        T::from_f64(2.0).unwrap()
            * (d.x.clone() * d.y.clone()
                + d.x.clone() * d.z.clone()
                + d.y.clone() * d.z.clone())
    }
}

impl<T: na::RealField> std::ops::Index<usize> for TBounds3<T> {
    type Output = na::Point3<T>;

    fn index(&self, i: usize) -> &Self::Output {
        if i == 0 {
            &self.p_min
        } else {
            &self.p_max
        }
    }
}

impl<T: na::RealField> TBounds3<T> {
    pub fn union(b1: &TBounds3<T>, b2: &TBounds3<T>) -> TBounds3<T> {
        TBounds3 {
            p_min: min_p(&b1.p_min, &b2.p_min),
            p_max: max_p(&b1.p_max, &b2.p_max),
        }
    }

    pub fn union_p(b: &TBounds3<T>, p: &na::Point3<T>) -> TBounds3<T> {
        TBounds3 {
            p_min: min_p(&b.p_min, &p),
            p_max: max_p(&b.p_max, &p),
        }
    }
}

impl Bounds3 {
    /// Squared distance from `p` to the box, zero when `p` is inside.
    /// An empty box reports an effectively infinite distance.
    pub fn distance_squared(&self, p: &na::Point3<f32>) -> f32 {
        let nearest = na::Point3::new(
            p.x.max(self.p_min.x).min(self.p_max.x),
            p.y.max(self.p_min.y).min(self.p_max.y),
            p.z.max(self.p_min.z).min(self.p_max.z),
        );
        (p - nearest).norm_squared()
    }
}
